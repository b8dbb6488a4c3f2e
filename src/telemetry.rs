//! Span constructors for channel observability.
//!
//! Every log line emitted inside one registry operation carries the channel
//! and the acting identity through these spans.

pub mod spans {
    use tracing::{Span, info_span};

    /// Span for a membership operation (join, part, kick).
    pub fn channel(name: &str, actor: &str) -> Span {
        info_span!("channel", channel = %name, actor = %actor)
    }

    /// Span for a mode request.
    pub fn mode(name: &str, actor: &str) -> Span {
        info_span!("mode", channel = %name, actor = %actor)
    }

    /// Span for an SJOIN from a peer.
    pub fn sjoin(name: &str, link: &str, ts: i64) -> Span {
        info_span!("sjoin", channel = %name, link = %link, ts = ts)
    }
}
