score_type! {
    /// A score with hard, medium and soft levels, compared in that order.
    ///
    /// ```
    /// use scoreforge_core::HardMediumSoftScore;
    ///
    /// let more_medium = HardMediumSoftScore::of(0, -10, -100);
    /// let more_soft = HardMediumSoftScore::of(0, -5, -200);
    /// assert!(more_soft > more_medium);
    /// assert_eq!(more_soft.to_string(), "0hard/-5medium/-200soft");
    /// ```
    HardMediumSoftScore {
        hard: Hard => "hard",
        medium: Medium => "medium",
        soft: Soft => "soft",
    }
}

impl HardMediumSoftScore {
    pub const ONE_HARD: HardMediumSoftScore = HardMediumSoftScore::of(1, 0, 0);
    pub const ONE_MEDIUM: HardMediumSoftScore = HardMediumSoftScore::of(0, 1, 0);
    pub const ONE_SOFT: HardMediumSoftScore = HardMediumSoftScore::of(0, 0, 1);
}
