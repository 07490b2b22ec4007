//! Http protocol supports.
//!
cfg_feature! {
    #![feature = "quinn"]

    pub mod webtransport;
    pub use webtransport::WebTransportSession;

    pub use h3::quic;
}
