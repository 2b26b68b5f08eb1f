pub mod entry;
pub mod message;
pub mod notice;

pub use entry::{decode_fragment, flag_glyph, split_fragment, ConfigEntry, SourceTag};
pub use message::{Channel, ChannelKind, Message};
pub use notice::ControlNotice;
