use crate::domain::errors::GraphError;
use crate::ports::outbound::CanonicalSerializer;
use shared_types::Entity;

/// Default canonical serializer using bincode's fixed little-endian layout.
#[derive(Debug, Default, Clone, Copy)]
pub struct BincodeSerializer;

impl CanonicalSerializer for BincodeSerializer {
    fn encode(&self, entities: &[&Entity]) -> Result<Vec<u8>, GraphError> {
        bincode::serialize(entities).map_err(|e| GraphError::Serialization(e.to_string()))
    }
}
