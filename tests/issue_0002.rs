//! City-name scenario: a two-word expression matched across an accented
//! variant of the utterance, by fuzzy trigram similarity rather than an
//! exact match.

use iron_throne::constraints::{ClaimScores, FullMatches, LargestClaim};
use iron_throne::pretenders::{Expression, ExpressionPretender};
use iron_throne::IronThrone;
use rand::SeedableRng;

const PHRASE_1: &str = "activity in La Rochelle";
const PHRASE_2: &str = "science \u{e0} La Rochelle";

fn engine() -> IronThrone {
    IronThrone::new(
        vec![Box::new(ExpressionPretender::new(vec![Expression::new(
            "city",
            "la-rochelle",
            "LA ROCHELLE",
        )]))],
        vec![
            Box::new(FullMatches),
            Box::new(LargestClaim),
            Box::new(ClaimScores),
        ],
    )
}

fn seeded_rng() -> rand::rngs::StdRng {
    rand::rngs::StdRng::seed_from_u64(11)
}

#[test]
fn test_la_rochelle_simple() {
    let mut rng = seeded_rng();
    let (entities, score) = engine().get_entities_with(PHRASE_1, 10_000, &mut rng);

    assert_eq!(entities.len(), 1);
    assert_eq!(entities[0].entity, "city");
    assert_eq!(entities[0].value, "la-rochelle");
    assert_eq!(entities[0].score, 1.0);
    assert_eq!(entities[0].length, 2);
    assert_eq!(score, 1.0);
}

#[test]
fn test_la_rochelle_accented_phrase_still_matches() {
    let mut rng = seeded_rng();
    let (entities, score) = engine().get_entities_with(PHRASE_2, 10_000, &mut rng);

    assert_eq!(entities.len(), 1);
    assert_eq!(entities[0].value, "la-rochelle");
    assert_eq!(score, 1.0);
}
