use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::config::Config;
use crate::db::Database;
use crate::models::StoredJob;

/// Seam for the text-generation service, so the cover-letter flow can be
/// exercised without network access.
pub trait CompletionProvider {
    fn complete(&self, prompt: &str) -> Result<String>;
}

// --- OpenAI provider ---

const OPENAI_API_URL: &str = "https://api.openai.com/v1/chat/completions";

#[derive(Debug, Serialize)]
struct ChatMessage {
    role: String,
    content: String,
}

#[derive(Debug, Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<ChatMessage>,
}

#[derive(Debug, Deserialize)]
struct ChatResponseMessage {
    content: String,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug)]
pub struct OpenAiProvider {
    api_key: String,
    model_id: String,
    client: reqwest::blocking::Client,
}

impl OpenAiProvider {
    pub fn from_config(config: &Config) -> Result<Self> {
        if config.openai_api_key.is_empty() {
            return Err(anyhow!(
                "OpenAI API key is empty in the config file (OpenAI_API_KEY)"
            ));
        }
        Ok(Self {
            api_key: config.openai_api_key.clone(),
            model_id: config.openai_model.clone(),
            client: reqwest::blocking::Client::new(),
        })
    }
}

impl CompletionProvider for OpenAiProvider {
    fn complete(&self, prompt: &str) -> Result<String> {
        let request = ChatRequest {
            model: self.model_id.clone(),
            messages: vec![ChatMessage {
                role: "user".to_string(),
                content: prompt.to_string(),
            }],
        };

        let response = self
            .client
            .post(OPENAI_API_URL)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .json(&request)
            .send()
            .context("Failed to send request to OpenAI API")?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().unwrap_or_default();
            return Err(anyhow!(
                "OpenAI API request failed with status {}: {}",
                status,
                error_text
            ));
        }

        let api_response: ChatResponse = response
            .json()
            .context("Failed to parse OpenAI API response")?;

        api_response
            .choices
            .first()
            .map(|choice| choice.message.content.clone())
            .ok_or_else(|| anyhow!("No choices in OpenAI API response"))
    }
}

// --- Cover-letter generation ---

/// Generate, store, and return the cover letter for a persisted job.
/// Idempotent: a letter already on the row is returned without touching
/// the completion service. Soft failures (unknown id, unreadable resume,
/// failed draft) come back as `Ok(None)` and are logged; a failed
/// refinement falls back to the draft.
pub fn generate_cover_letter(
    db: &Database,
    config: &Config,
    provider: &dyn CompletionProvider,
    job_id: i64,
) -> Result<Option<String>> {
    let Some(job) = db.get_job(&config.jobs_tablename, job_id)? else {
        warn!(job_id, "cover letter requested for unknown job");
        return Ok(None);
    };

    if let Some(letter) = &job.cover_letter {
        if !letter.is_empty() {
            return Ok(Some(letter.clone()));
        }
    }

    let resume = match std::fs::read_to_string(&config.resume_path) {
        Ok(text) => text,
        Err(e) => {
            warn!(path = %config.resume_path, error = %e, "failed to read resume");
            return Ok(None);
        }
    };

    let draft = match provider.complete(&draft_prompt(&job, &resume)) {
        Ok(text) => text,
        Err(e) => {
            warn!(job_id, error = %e, "cover letter draft failed");
            return Ok(None);
        }
    };

    let letter = match provider.complete(&refine_prompt(&job, &resume, &draft)) {
        Ok(text) => text,
        Err(e) => {
            warn!(job_id, error = %e, "refinement failed, keeping the draft");
            draft
        }
    };

    db.set_cover_letter(&config.jobs_tablename, job_id, &letter)?;
    Ok(Some(letter))
}

fn draft_prompt(job: &StoredJob, resume: &str) -> String {
    format!(
        "You are a career coach with over 15 years of experience helping job seekers land \
         their dream jobs in tech. You are helping a candidate to write a cover letter for \
         the below role. Approach this task in three steps. \
         Step 1. Identify main challenges someone in this position would face day to day. \
         Step 2. Write an attention grabbing hook for your cover letter that highlights your \
         experience and qualifications in a way that shows you empathize and can successfully \
         take on challenges of the role. Consider incorporating specific examples of how you \
         tackled these challenges in your past work, and explore creative ways to express \
         your enthusiasm for the opportunity. Put emphasis on how the candidate can \
         contribute to company as opposed to just listing accomplishments. Keep your hook \
         within 100 words or less. \
         Step 3. Finish writing the cover letter based on the resume and keep it within 250 \
         words. Respond with final cover letter only. \n job description: {} \n company: {} \
         \n title: {} \n resume: {}",
        job.job_description, job.company, job.title, resume
    )
}

fn refine_prompt(job: &StoredJob, resume: &str, draft: &str) -> String {
    format!(
        "You are young but experienced career coach helping job seekers land their dream \
         jobs in tech. I need your help crafting a cover letter. \
         Here is a job description: {} \nhere is my resume: {} \nHere's the cover letter I \
         got so far: {} I need you to help me improve it. Let's approach this in following \
         steps. \n\
         Step 1. Please set the formality scale as follows: 1 is conversational English, my \
         initial Cover letter draft is 10. \
         Step 2. Identify three to five ways this cover letter can be improved, and \
         elaborate on each way with at least one thoughtful sentence. \
         Step 4. Suggest an improved cover letter based on these suggestions with the \
         Formality Score set to 7. Avoid subjective qualifiers such as drastic, \
         transformational, etc. Keep the final cover letter within 250 words. \
         Please respond with the final cover letter only.",
        job.job_description, resume, draft
    )
}
