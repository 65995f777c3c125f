pub mod inbound;
pub mod outbound;

pub use inbound::{ChatlayerDecoder, map_button, map_card, parse_button_payload};
pub use outbound::{
    ChatlayerEncoder, IntroMessage, PostbackMessage, RequestBody, RequestMessage, TextMessage,
};
