mod operators;
mod scenarios;

use scoreforge_core::Score;

use super::ScoreDirector;

fn score<Sc: Score>(director: &mut ScoreDirector<Sc>) -> Sc {
    director
        .calculate_score()
        .unwrap_or_else(|e| panic!("score should calculate: {e}"))
}

/// Live match count of one constraint, tracking or not.
fn match_count<Sc: Score>(director: &mut ScoreDirector<Sc>, constraint: &str) -> usize {
    let explanation = director
        .explain()
        .unwrap_or_else(|e| panic!("explain should succeed: {e}"));
    explanation
        .analysis(constraint)
        .unwrap_or_else(|| panic!("no constraint named {constraint}"))
        .match_count
}
