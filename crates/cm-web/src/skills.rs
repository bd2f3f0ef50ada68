//! Skills-quiz management.
//!
//! The skills overview resolves the signed-in civil servant's profession
//! and, when one exists, that profession's quiz. Questions are added one
//! at a time or in bulk from a CSV upload. Chained upstream calls here
//! have no compensation: a failure part-way surfaces immediately, and the
//! overview re-resolves everything on its next visit.

use axum::extract::{Multipart, State};
use axum::response::Response;
use axum::routing::{get, post};
use axum::{Form, Router};
use axum_extra::extract::Form as ExtraForm;
use chrono::{Datelike, Utc};
use serde::Deserialize;
use serde_json::json;

use cm_csrs::{Choice, Profession, Question};

use crate::auth::Authenticated;
use crate::error::{WebError, WebResult};
use crate::session::{Flash, SessionHandle};
use crate::state::AppState;
use crate::view::{see_other, View};

const CHOICE_KEYS: &[&str] = &["A", "B", "C", "D", "E"];

#[derive(Debug, Deserialize)]
struct QuestionForm {
    #[serde(default, rename = "type")]
    question_type: String,
    #[serde(default)]
    value: String,
    #[serde(default, rename = "learningName")]
    learning_name: String,
    #[serde(default, rename = "learningReference")]
    learning_reference: String,
    #[serde(default)]
    theme: String,
    #[serde(default)]
    why: String,
    #[serde(default, rename = "choiceA")]
    choice_a: String,
    #[serde(default, rename = "choiceB")]
    choice_b: String,
    #[serde(default, rename = "choiceC")]
    choice_c: String,
    #[serde(default, rename = "choiceD")]
    choice_d: String,
    #[serde(default, rename = "choiceE")]
    choice_e: String,
    #[serde(default)]
    answers: Vec<String>,
}

impl QuestionForm {
    fn into_question(self) -> Question {
        let offered = [
            ("A", self.choice_a),
            ("B", self.choice_b),
            ("C", self.choice_c),
            ("D", self.choice_d),
            ("E", self.choice_e),
        ];

        let choices: Vec<Choice> = offered
            .iter()
            .filter(|(_, value)| !value.is_empty())
            .map(|(_, value)| Choice {
                value: value.clone(),
            })
            .collect();

        let answers: Vec<Choice> = offered
            .iter()
            .filter(|(key, value)| !value.is_empty() && self.answers.iter().any(|a| a == key))
            .map(|(_, value)| Choice {
                value: value.clone(),
            })
            .collect();

        Question {
            question_type: self.question_type,
            value: self.value,
            learning_name: self.learning_name,
            learning_reference: self.learning_reference,
            theme: self.theme,
            why: self.why,
            choices,
            answers,
        }
    }
}

#[derive(Debug, Deserialize)]
struct DeleteQuizForm {
    #[serde(default, rename = "professionId")]
    profession_id: String,
}

async fn get_skills(
    State(state): State<AppState>,
    Authenticated(identity): Authenticated,
    session: SessionHandle,
) -> WebResult<View> {
    let civil_servant = state.csrs.civil_servant_me(&identity.access_token).await?;

    let profession = civil_servant
        .profession
        .as_ref()
        .and_then(|p| p.resolved_id().map(|id| (id, p.name.clone())));

    let quiz = match profession {
        Some((profession_id, _)) => {
            state
                .csrs
                .quiz_info(&identity.access_token, profession_id)
                .await?
        }
        None => None,
    };

    let flash = session.take_flash().unwrap_or_default();

    Ok(View::new(
        "page/skills/skills",
        json!({
            "professionID": profession.as_ref().map(|(id, _)| id),
            "professionName": profession.as_ref().map(|(_, name)| name),
            "professionQuestions": quiz.map(|q| q.questions),
            "flash": flash.into_context(),
        }),
    ))
}

async fn get_add_question(_auth: Authenticated, session: SessionHandle) -> View {
    let flash = session.take_flash().unwrap_or_default();
    View::new(
        "page/skills/add-new-question",
        json!({ "flash": flash.into_context() }),
    )
}

async fn add_question(
    State(state): State<AppState>,
    Authenticated(identity): Authenticated,
    session: SessionHandle,
    ExtraForm(form): ExtraForm<QuestionForm>,
) -> WebResult<Response> {
    if form.value.trim().is_empty() {
        let mut errors = cm_catalogue::ValidationErrors::default();
        errors.add("value", "validation.skills.question.empty");
        session.put_flash(Flash::errors(errors, json!({})));
        return Ok(see_other("/content-management/skills/add-new-question"));
    }

    let question = form.into_question();
    state
        .csrs
        .add_question(&identity.access_token, &question)
        .await?;

    Ok(see_other("/content-management/skills/success"))
}

/// Bulk question upload. The CSV columns mirror the authoring template:
/// TYPE, QUESTION, LEARNING NAME, LEARNING REFERENCE, THEME, WHY, then
/// CHOICE A-E with ANSWER A-E set to YES for correct choices. The rows
/// are loaded into the Policy profession's quiz.
async fn upload_questions(
    State(state): State<AppState>,
    Authenticated(identity): Authenticated,
    session: SessionHandle,
    mut multipart: Multipart,
) -> WebResult<Response> {
    let mut csv_body: Option<Vec<u8>> = None;

    while let Ok(Some(field)) = multipart.next_field().await {
        if field.name() != Some("file") {
            continue;
        }
        let is_csv = field
            .file_name()
            .map(|name| name.to_ascii_lowercase().ends_with(".csv"))
            .unwrap_or(false);

        if !is_csv {
            break;
        }
        csv_body = field.bytes().await.ok().map(|bytes| bytes.to_vec());
        break;
    }

    let Some(csv_body) = csv_body else {
        session.put_flash(Flash {
            errors: None,
            form: Some(json!({ "uploadedFileNotCSV": true })),
            message: None,
        });
        return Ok(see_other("/content-management/skills"));
    };

    let questions = parse_question_rows(&csv_body);

    let profession = policy_profession(&state, &identity.access_token).await?;
    let profession_id = profession
        .resolved_id()
        .ok_or(WebError::NotFound)?;

    // create (or reuse) the quiz, then load every question into it
    state
        .csrs
        .create_quiz_for_profession(&identity.access_token, profession_id)
        .await?;

    for question in &questions {
        state
            .csrs
            .add_question(&identity.access_token, question)
            .await?;
    }

    Ok(see_other("/content-management/skills/success"))
}

fn parse_question_rows(csv_body: &[u8]) -> Vec<Question> {
    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(csv_body);

    let headers = match reader.headers() {
        Ok(headers) => headers.clone(),
        Err(_) => return vec![],
    };
    let column = |name: &str| headers.iter().position(|h| h == name);

    let mut questions = Vec::new();
    for record in reader.records().flatten() {
        let field = |name: &str| {
            column(name)
                .and_then(|idx| record.get(idx))
                .unwrap_or_default()
                .to_string()
        };

        let mut choices = Vec::new();
        let mut answers = Vec::new();
        for key in CHOICE_KEYS {
            let choice = field(&format!("CHOICE {key}"));
            if choice.is_empty() {
                continue;
            }
            if field(&format!("ANSWER {key}")) == "YES" {
                answers.push(Choice {
                    value: choice.clone(),
                });
            }
            choices.push(Choice { value: choice });
        }

        questions.push(Question {
            question_type: field("TYPE"),
            value: field("QUESTION"),
            learning_name: field("LEARNING NAME"),
            learning_reference: field("LEARNING REFERENCE"),
            theme: field("THEME"),
            why: field("WHY"),
            choices,
            answers,
        });
    }

    questions
}

async fn policy_profession(state: &AppState, token: &str) -> WebResult<Profession> {
    state
        .csrs
        .areas_of_work(token)
        .await?
        .into_iter()
        .find(|profession| profession.name.eq_ignore_ascii_case("policy"))
        .ok_or(WebError::NotFound)
}

async fn delete_quiz(
    State(state): State<AppState>,
    Authenticated(identity): Authenticated,
    session: SessionHandle,
    Form(form): Form<DeleteQuizForm>,
) -> WebResult<Response> {
    let profession_id: u64 = form.profession_id.parse().map_err(|_| WebError::NotFound)?;

    state
        .csrs
        .delete_quiz(&identity.access_token, profession_id)
        .await?;

    session.put_flash(Flash::message("quizDeletedMessage"));
    Ok(see_other("/content-management/skills"))
}

async fn get_skills_success(_auth: Authenticated) -> View {
    View::new("page/skills/success", json!({}))
}

async fn get_skills_report(_auth: Authenticated) -> View {
    let today = Utc::now().date_naive();
    let start_of_year = today.with_month(1).and_then(|d| d.with_day(1));

    View::new(
        "page/skills/generate-report",
        json!({
            "placeholder": {
                "from": start_of_year,
                "to": today,
            }
        }),
    )
}

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/skills", get(get_skills).post(upload_questions))
        .route(
            "/skills/add-new-question",
            get(get_add_question).post(add_question),
        )
        .route("/skills/delete-quiz", post(delete_quiz))
        .route("/skills/success", get(get_skills_success))
        .route("/skills/generate-report", get(get_skills_report))
}
