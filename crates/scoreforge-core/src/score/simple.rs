score_type! {
    /// A score with a single level, written without a suffix.
    ///
    /// ```
    /// use scoreforge_core::{Score, SimpleScore};
    ///
    /// assert!(SimpleScore::of(-3) > SimpleScore::of(-5));
    /// assert!(!SimpleScore::of(-3).is_feasible());
    /// assert_eq!(SimpleScore::of(-3).to_string(), "-3");
    /// ```
    SimpleScore { score: Soft => "" }
}

impl SimpleScore {
    /// The usual unit weight.
    pub const ONE: SimpleScore = SimpleScore::of(1);
}

impl From<i64> for SimpleScore {
    fn from(score: i64) -> Self {
        SimpleScore::of(score)
    }
}
