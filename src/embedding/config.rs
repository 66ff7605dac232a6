use std::time::Duration;

pub const OPENAI_API_KEY: &str = "OPENAI_API_KEY";
pub const VOYAGE_API_KEY: &str = "VOYAGE_API_KEY";
pub const GEMINI_API_KEY: &str = "GEMINI_API_KEY";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ProviderKind {
    OpenAi,
    Voyage,
    Gemini,
    Mock,
    /// Picks the first provider whose API key is set.
    #[default]
    Auto,
}

impl ProviderKind {
    pub fn model_id(&self) -> &'static str {
        match self {
            Self::OpenAi => "text-embedding-3-small",
            Self::Voyage => "voyage-3",
            Self::Gemini => "text-embedding-004",
            Self::Mock | Self::Auto => "mock",
        }
    }

    pub fn api_key_var(&self) -> Option<&'static str> {
        match self {
            Self::OpenAi => Some(OPENAI_API_KEY),
            Self::Voyage => Some(VOYAGE_API_KEY),
            Self::Gemini => Some(GEMINI_API_KEY),
            Self::Mock | Self::Auto => None,
        }
    }

    /// Resolves `Auto` using the given key lookup: OpenAI, then Voyage, then
    /// Gemini. With no key at all it falls back to the offline mock.
    pub fn resolve(self, has_key: impl Fn(&str) -> bool) -> Self {
        match self {
            Self::Auto if has_key(OPENAI_API_KEY) => Self::OpenAi,
            Self::Auto if has_key(VOYAGE_API_KEY) => Self::Voyage,
            Self::Auto if has_key(GEMINI_API_KEY) => Self::Gemini,
            Self::Auto => Self::Mock,
            other => other,
        }
    }
}

impl std::str::FromStr for ProviderKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "openai" => Ok(Self::OpenAi),
            "voyage" => Ok(Self::Voyage),
            "gemini" => Ok(Self::Gemini),
            "mock" => Ok(Self::Mock),
            "auto" => Ok(Self::Auto),
            _ => Err(format!("Unknown embedding provider: {}", s)),
        }
    }
}

impl std::fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::OpenAi => write!(f, "openai"),
            Self::Voyage => write!(f, "voyage"),
            Self::Gemini => write!(f, "gemini"),
            Self::Mock => write!(f, "mock"),
            Self::Auto => write!(f, "auto"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct EmbeddingConfig {
    pub provider: ProviderKind,
    pub cache_size: usize,
    pub timeout: Duration,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            provider: ProviderKind::Auto,
            cache_size: 1000,
            timeout: Duration::from_millis(30000),
        }
    }
}
