//! Score-based content-type resolution.
//!
//! When a request does not name a content type, the same query embedding
//! is searched against every built index and the type whose best hit
//! scores highest wins. This keeps detection in embedding space instead
//! of guessing from query keywords, so "rain sounds" and "rainy day
//! music" resolve from what the corpus actually contains.

use tracing::debug;

use crate::types::ContentType;

/// Two top scores within this distance are considered tied.
const SCORE_TIE_EPSILON: f32 = 1e-6;

/// Outcome of resolving a content type from per-index top scores.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Resolution {
    pub content_type: ContentType,
    /// Raw inner-product score of the winning index's best hit.
    pub top_score: f32,
}

/// Picks the content type whose index holds the best match.
///
/// `candidates` carries the top-1 raw score per searched index, in any
/// order. Ties resolve in [`ContentType::ALL`] order, so a song/sfx tie
/// goes to the song index.
#[must_use]
pub fn resolve_content_type(candidates: &[(ContentType, f32)]) -> Option<Resolution> {
    let mut best: Option<Resolution> = None;

    for content_type in ContentType::ALL {
        let Some(&(_, score)) = candidates.iter().find(|(ct, _)| *ct == content_type) else {
            continue;
        };

        match best {
            Some(current) if score <= current.top_score + SCORE_TIE_EPSILON => {}
            _ => {
                best = Some(Resolution {
                    content_type,
                    top_score: score,
                });
            }
        }
    }

    if let Some(resolution) = best {
        debug!(
            content_type = %resolution.content_type,
            top_score = resolution.top_score,
            "content type resolved from index scores"
        );
    }
    best
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_highest_score_wins() {
        let resolution = resolve_content_type(&[
            (ContentType::Song, 0.41),
            (ContentType::Sfx, 0.87),
        ])
        .unwrap();
        assert_eq!(resolution.content_type, ContentType::Sfx);
        assert_eq!(resolution.top_score, 0.87);
    }

    #[test]
    fn test_candidate_order_does_not_matter() {
        let a = resolve_content_type(&[(ContentType::Sfx, 0.2), (ContentType::Song, 0.9)]);
        let b = resolve_content_type(&[(ContentType::Song, 0.9), (ContentType::Sfx, 0.2)]);
        assert_eq!(a, b);
        assert_eq!(a.unwrap().content_type, ContentType::Song);
    }

    #[test]
    fn test_exact_tie_goes_to_song() {
        let resolution =
            resolve_content_type(&[(ContentType::Sfx, 0.75), (ContentType::Song, 0.75)]).unwrap();
        assert_eq!(resolution.content_type, ContentType::Song);
    }

    #[test]
    fn test_near_tie_within_epsilon_goes_to_song() {
        let resolution = resolve_content_type(&[
            (ContentType::Song, 0.750_000_0),
            (ContentType::Sfx, 0.750_000_5),
        ])
        .unwrap();
        assert_eq!(resolution.content_type, ContentType::Song);
    }

    #[test]
    fn test_difference_beyond_epsilon_is_decisive() {
        let resolution =
            resolve_content_type(&[(ContentType::Song, 0.75), (ContentType::Sfx, 0.7501)])
                .unwrap();
        assert_eq!(resolution.content_type, ContentType::Sfx);
    }

    #[test]
    fn test_single_candidate() {
        let resolution = resolve_content_type(&[(ContentType::Sfx, 0.1)]).unwrap();
        assert_eq!(resolution.content_type, ContentType::Sfx);
    }

    #[test]
    fn test_no_candidates() {
        assert!(resolve_content_type(&[]).is_none());
    }
}
