mod channels;
mod codec;
mod parser;

pub use channels::{Channel, CHANNEL_KEYS};
pub use codec::{SensorLineCodec, MAX_LINE_BYTES};
pub use parser::{
    coerce_number, decode_record, extract_json_object, SensorPayload, StaleToken,
};
