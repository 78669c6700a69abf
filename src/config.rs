// src/config.rs
use std::env;
use std::path::PathBuf;

/// Endpoint and model defaults for the completion client.
pub const DEFAULT_COMPLETIONS_URL: &str = "https://api.openai.com/v1/chat/completions";
pub const DEFAULT_MODEL: &str = "gpt-3.5-turbo";

/// How many prompt/completion pairs to ask for per chunk.
pub const DEFAULT_PAIRS_PER_CHUNK: usize = 20;

/// Instruction prompt sent as the system message, with a `{count}`
/// placeholder for the requested number of pairs. The worked example anchors
/// the output shape the record extractor expects.
pub const DEFAULT_PROMPT_TEMPLATE: &str = r#"Please generate {count} appropriate questions for the following text and place the questions and text in JSONL format.
The "completion" should come verbatim from the text. You must use the "you" form for questions. You must utilize the entire text:
Example:{"prompt":"What is the strategy to adapt if you think you don't have money to save?", "completion":"You say you don't have it, take it off the top and forget it's there. You will adjust and once you adjust, it will provide financial freedom for the long term."} {"prompt":"Why is it important to become an owner and not just a consumer?", "completion":"First, you've got to get in the game. You've got to become an owner, not just a consumer."}"#;

/// Instruction prompt as configuration: a template plus the pair count,
/// both overridable through the environment.
#[derive(Debug, Clone)]
pub struct PromptTemplate {
    template: String,
    pairs_per_chunk: usize,
}

impl PromptTemplate {
    pub fn new(template: impl Into<String>, pairs_per_chunk: usize) -> Self {
        Self {
            template: template.into(),
            pairs_per_chunk,
        }
    }

    /// Expands the template into the final system prompt.
    pub fn render(&self) -> String {
        self.template
            .replace("{count}", &self.pairs_per_chunk.to_string())
    }
}

impl Default for PromptTemplate {
    fn default() -> Self {
        Self::new(DEFAULT_PROMPT_TEMPLATE, DEFAULT_PAIRS_PER_CHUNK)
    }
}

#[derive(Debug, Clone)]
pub struct ApiConfig {
    pub host: String,
    pub port: u16,
    pub dataset_dir: PathBuf,
    pub completions_url: String,
    pub model: String,
    pub prompt: PromptTemplate,
}

impl ApiConfig {
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();
        let host = env::var("BIND_HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
        let port = env::var("BIND_PORT")
            .unwrap_or_else(|_| "3020".to_string())
            .parse()
            .expect("BIND_PORT must be a valid u16");
        let dataset_dir =
            PathBuf::from(env::var("DATASET_DIR").unwrap_or_else(|_| "datasets".to_string()));
        let completions_url = env::var("OPENAI_API_URL")
            .unwrap_or_else(|_| DEFAULT_COMPLETIONS_URL.to_string());
        let model = env::var("OPENAI_MODEL").unwrap_or_else(|_| DEFAULT_MODEL.to_string());

        let template = env::var("INSTRUCTION_PROMPT")
            .unwrap_or_else(|_| DEFAULT_PROMPT_TEMPLATE.to_string());
        let pairs_per_chunk = env::var("PAIRS_PER_CHUNK")
            .ok()
            .map(|v| v.parse().expect("PAIRS_PER_CHUNK must be a positive integer"))
            .unwrap_or(DEFAULT_PAIRS_PER_CHUNK);

        Self {
            host,
            port,
            dataset_dir,
            completions_url,
            model,
            prompt: PromptTemplate::new(template, pairs_per_chunk),
        }
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
