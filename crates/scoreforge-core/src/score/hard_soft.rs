score_type! {
    /// A score with separate hard and soft levels.
    ///
    /// Hard levels are compared first; soft levels only break ties.
    ///
    /// ```
    /// use scoreforge_core::{HardSoftScore, ParseableScore};
    ///
    /// let broken = HardSoftScore::of(-1, -100);
    /// let feasible = HardSoftScore::of(0, -200);
    /// assert!(feasible > broken);
    /// assert_eq!(HardSoftScore::parse("0hard/-200soft"), Ok(feasible));
    /// ```
    HardSoftScore { hard: Hard => "hard", soft: Soft => "soft" }
}

impl HardSoftScore {
    pub const ONE_HARD: HardSoftScore = HardSoftScore::of(1, 0);
    pub const ONE_SOFT: HardSoftScore = HardSoftScore::of(0, 1);

    #[inline]
    pub const fn of_hard(hard: i64) -> Self {
        HardSoftScore::of(hard, 0)
    }

    #[inline]
    pub const fn of_soft(soft: i64) -> Self {
        HardSoftScore::of(0, soft)
    }
}
