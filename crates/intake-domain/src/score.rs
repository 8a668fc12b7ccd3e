//! Score module - the scoring collaborator's verdict on a submission

/// Category label that exempts a submission from the score threshold
pub const IMAGE_CATEGORY: &str = "image";

/// Quality/relevance verdict for a URL
///
/// Produced once by the scoring collaborator and never modified.
#[derive(Debug, Clone, PartialEq)]
pub struct ScoreResult {
    /// Score in [0.0, 1.0]
    pub score: f64,

    /// Free-text explanation
    pub reason: String,

    /// Category labels
    pub categories: Vec<String>,

    /// Whether the scorer recommends full processing
    pub recommended: bool,

    /// Labels for anything that looked malicious
    pub malicious_indicators: Vec<String>,
}

impl ScoreResult {
    /// Create a result with just a score and reason
    pub fn new(score: f64, reason: impl Into<String>) -> Self {
        Self {
            score,
            reason: reason.into(),
            categories: Vec::new(),
            recommended: false,
            malicious_indicators: Vec::new(),
        }
    }

    /// Attach category labels
    pub fn with_categories<I, S>(mut self, categories: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.categories = categories.into_iter().map(Into::into).collect();
        self
    }

    /// Whether any category is the image label
    pub fn is_image(&self) -> bool {
        self.categories.iter().any(|c| c == IMAGE_CATEGORY)
    }
}
