//! Topic parsing.
//!
//! Topics have the shape `<base>/<rx-callsign>/<tx-callsign>/<suffix>`.

use tracing::warn;

/// Extract the transmitting station's callsign from a message topic.
///
/// Returns an empty string (and logs a warning) when the topic has fewer
/// than four segments.
pub fn sender_id(topic: &str) -> &str {
    let mut segments = topic.split('/');
    let tx = segments.nth(2);
    match (tx, segments.next()) {
        (Some(tx), Some(_)) => tx,
        _ => {
            warn!("Unexpected topic format: {topic}");
            ""
        }
    }
}
