//! # Datagram Codec
//!
//! Hand-rolled big-endian layout, see [`super::message`]. Batches larger than
//! the datagram limit are split into fragments that each repeat the proof
//! record, so every fragment can be checked on its own.

use super::errors::TransportError;
use super::message::{
    Datagram, DatagramKind, Header, ENTITY_PREFIX_LEN, HEADER_LEN, MAGIC, PROOF_LEN, TAG_HYPEREDGE,
    TAG_NODE, VERSION,
};
use shared_types::{AgentId, Entity, Hyperedge, Invariants, Node, Proof};

// =============================================================================
// ENCODING
// =============================================================================

/// Encode a header-only sync request.
pub fn encode_sync_request(fingerprint: [u8; 8], batch_id: u64) -> Vec<u8> {
    let mut out = Vec::with_capacity(HEADER_LEN);
    put_header(
        &mut out,
        &Header {
            kind: DatagramKind::SyncRequest,
            fingerprint,
            batch_id,
            index: 0,
            count: 1,
        },
    );
    out
}

/// Encode a proof and its entities into one or more datagrams of at most
/// `max_bytes` each.
pub fn encode_transition(
    fingerprint: [u8; 8],
    batch_id: u64,
    proof: &Proof,
    entities: &[Entity],
    max_bytes: usize,
) -> Result<Vec<Vec<u8>>, TransportError> {
    let budget = max_bytes.saturating_sub(HEADER_LEN + PROOF_LEN);

    // Greedy packing of whole entity records into fragments.
    let mut fragments: Vec<Vec<u8>> = vec![Vec::new()];
    for entity in entities {
        let record = encode_entity(entity)?;
        if record.len() > budget {
            return Err(TransportError::EntityTooLarge {
                id: entity.id().to_string(),
                bytes: record.len(),
                budget,
            });
        }
        let needs_new = fragments
            .last()
            .map_or(true, |current| current.len() + record.len() > budget);
        if needs_new && fragments.last().map_or(false, |f| !f.is_empty()) {
            fragments.push(Vec::new());
        }
        if let Some(current) = fragments.last_mut() {
            current.extend_from_slice(&record);
        }
    }

    let count = u16::try_from(fragments.len())
        .map_err(|_| TransportError::BatchTooLarge(fragments.len()))?;

    let mut datagrams = Vec::with_capacity(fragments.len());
    for (index, body) in fragments.into_iter().enumerate() {
        let mut out = Vec::with_capacity(HEADER_LEN + PROOF_LEN + body.len());
        put_header(
            &mut out,
            &Header {
                kind: DatagramKind::Transition,
                fingerprint,
                batch_id,
                index: index as u16,
                count,
            },
        );
        put_proof(&mut out, proof);
        out.extend_from_slice(&body);
        datagrams.push(out);
    }
    Ok(datagrams)
}

/// Fail with `EntityTooLarge` when `entity` cannot travel in a datagram of
/// `max_bytes`.
pub fn check_entity_fits(entity: &Entity, max_bytes: usize) -> Result<(), TransportError> {
    let budget = max_bytes.saturating_sub(HEADER_LEN + PROOF_LEN);
    let record = encode_entity(entity)?;
    if record.len() > budget {
        return Err(TransportError::EntityTooLarge {
            id: entity.id().to_string(),
            bytes: record.len(),
            budget,
        });
    }
    Ok(())
}

fn put_header(out: &mut Vec<u8>, header: &Header) {
    out.push(MAGIC);
    out.push(VERSION);
    out.push(header.kind as u8);
    out.extend_from_slice(&header.fingerprint);
    out.extend_from_slice(&header.batch_id.to_be_bytes());
    out.extend_from_slice(&header.index.to_be_bytes());
    out.extend_from_slice(&header.count.to_be_bytes());
}

fn put_proof(out: &mut Vec<u8>, proof: &Proof) {
    out.extend_from_slice(&proof.agent_id.0);
    out.extend_from_slice(&proof.sequence.to_be_bytes());
    out.extend_from_slice(&proof.dimension.to_be_bytes());
    out.extend_from_slice(&proof.invariants.betti_0.to_be_bytes());
    out.extend_from_slice(&proof.invariants.betti_1.to_be_bytes());
    out.extend_from_slice(&proof.signature);
}

fn encode_entity(entity: &Entity) -> Result<Vec<u8>, TransportError> {
    let mut body = Vec::new();
    let tag = match entity {
        Entity::Node(node) => {
            put_str(&mut body, &node.id)?;
            put_str(&mut body, &node.label)?;
            body.extend_from_slice(&node.creator.0);
            body.extend_from_slice(&node.sequence.to_be_bytes());
            TAG_NODE
        }
        Entity::Hyperedge(edge) => {
            put_str(&mut body, &edge.id)?;
            put_str(&mut body, &edge.relation)?;
            body.extend_from_slice(&edge.creator.0);
            body.extend_from_slice(&edge.sequence.to_be_bytes());
            let members = u16::try_from(edge.members.len()).map_err(|_| {
                TransportError::EntityTooLarge {
                    id: edge.id.clone(),
                    bytes: edge.members.len(),
                    budget: u16::MAX as usize,
                }
            })?;
            body.extend_from_slice(&members.to_be_bytes());
            for member in &edge.members {
                put_str(&mut body, member)?;
            }
            TAG_HYPEREDGE
        }
    };

    let body_len = u16::try_from(body.len()).map_err(|_| TransportError::EntityTooLarge {
        id: entity.id().to_string(),
        bytes: body.len(),
        budget: u16::MAX as usize,
    })?;
    let mut record = Vec::with_capacity(ENTITY_PREFIX_LEN + body.len());
    record.push(tag);
    record.extend_from_slice(&body_len.to_be_bytes());
    record.extend_from_slice(&body);
    Ok(record)
}

fn put_str(out: &mut Vec<u8>, value: &str) -> Result<(), TransportError> {
    let len = u16::try_from(value.len()).map_err(|_| TransportError::EntityTooLarge {
        id: value.chars().take(16).collect(),
        bytes: value.len(),
        budget: u16::MAX as usize,
    })?;
    out.extend_from_slice(&len.to_be_bytes());
    out.extend_from_slice(value.as_bytes());
    Ok(())
}

// =============================================================================
// DECODING
// =============================================================================

/// Decode one datagram. Any deviation from the layout is `MalformedDatagram`.
pub fn decode(bytes: &[u8]) -> Result<Datagram, TransportError> {
    let mut reader = Reader::new(bytes);
    let header = read_header(&mut reader)?;

    match header.kind {
        DatagramKind::SyncRequest => {
            reader.finish()?;
            Ok(Datagram::SyncRequest { header })
        }
        DatagramKind::Transition => {
            let proof = read_proof(&mut reader)?;
            let mut entities = Vec::new();
            while !reader.is_empty() {
                entities.push(read_entity(&mut reader)?);
            }
            Ok(Datagram::Transition {
                header,
                proof,
                entities,
            })
        }
    }
}

fn read_header(reader: &mut Reader<'_>) -> Result<Header, TransportError> {
    let magic = reader.u8()?;
    if magic != MAGIC {
        return Err(TransportError::malformed(format!("bad magic 0x{magic:02x}")));
    }
    let version = reader.u8()?;
    if version != VERSION {
        return Err(TransportError::malformed(format!(
            "unsupported version {version}"
        )));
    }
    let kind_byte = reader.u8()?;
    let kind = DatagramKind::from_byte(kind_byte)
        .ok_or_else(|| TransportError::malformed(format!("unknown kind 0x{kind_byte:02x}")))?;
    let fingerprint = reader.array::<8>()?;
    let batch_id = reader.u64()?;
    let index = reader.u16()?;
    let count = reader.u16()?;
    if count == 0 || index >= count {
        return Err(TransportError::malformed(format!(
            "fragment {index} of {count}"
        )));
    }
    Ok(Header {
        kind,
        fingerprint,
        batch_id,
        index,
        count,
    })
}

fn read_proof(reader: &mut Reader<'_>) -> Result<Proof, TransportError> {
    let agent_id = AgentId(reader.array::<32>()?);
    let sequence = reader.u64()?;
    let dimension = reader.u16()?;
    let betti_0 = reader.u16()?;
    let betti_1 = reader.u16()?;
    let signature = reader.array::<64>()?;
    Ok(Proof {
        agent_id,
        sequence,
        dimension,
        invariants: Invariants::new(betti_0, betti_1),
        signature,
    })
}

fn read_entity(reader: &mut Reader<'_>) -> Result<Entity, TransportError> {
    let tag = reader.u8()?;
    let body_len = reader.u16()? as usize;
    let mut body = Reader::new(reader.take(body_len)?);

    let entity = match tag {
        TAG_NODE => {
            let id = body.string()?;
            let label = body.string()?;
            let creator = AgentId(body.array::<32>()?);
            let sequence = body.u64()?;
            Entity::Node(Node {
                id,
                label,
                creator,
                sequence,
            })
        }
        TAG_HYPEREDGE => {
            let id = body.string()?;
            let relation = body.string()?;
            let creator = AgentId(body.array::<32>()?);
            let sequence = body.u64()?;
            let count = body.u16()? as usize;
            let mut members = Vec::with_capacity(count.min(64));
            for _ in 0..count {
                members.push(body.string()?);
            }
            Entity::Hyperedge(Hyperedge {
                id,
                relation,
                members,
                creator,
                sequence,
            })
        }
        other => {
            return Err(TransportError::malformed(format!(
                "unknown entity tag {other}"
            )))
        }
    };
    body.finish()?;
    Ok(entity)
}

/// Bounds-checked big-endian cursor.
struct Reader<'a> {
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    fn new(bytes: &'a [u8]) -> Self {
        Self { bytes, pos: 0 }
    }

    fn is_empty(&self) -> bool {
        self.pos >= self.bytes.len()
    }

    fn take(&mut self, len: usize) -> Result<&'a [u8], TransportError> {
        let end = self
            .pos
            .checked_add(len)
            .filter(|end| *end <= self.bytes.len())
            .ok_or_else(|| {
                TransportError::malformed(format!(
                    "truncated: need {len} bytes at offset {}, have {}",
                    self.pos,
                    self.bytes.len().saturating_sub(self.pos)
                ))
            })?;
        let slice = &self.bytes[self.pos..end];
        self.pos = end;
        Ok(slice)
    }

    fn array<const N: usize>(&mut self) -> Result<[u8; N], TransportError> {
        let mut out = [0u8; N];
        out.copy_from_slice(self.take(N)?);
        Ok(out)
    }

    fn u8(&mut self) -> Result<u8, TransportError> {
        Ok(self.array::<1>()?[0])
    }

    fn u16(&mut self) -> Result<u16, TransportError> {
        Ok(u16::from_be_bytes(self.array::<2>()?))
    }

    fn u64(&mut self) -> Result<u64, TransportError> {
        Ok(u64::from_be_bytes(self.array::<8>()?))
    }

    fn string(&mut self) -> Result<String, TransportError> {
        let len = self.u16()? as usize;
        let raw = self.take(len)?;
        std::str::from_utf8(raw)
            .map(str::to_owned)
            .map_err(|_| TransportError::malformed("string is not UTF-8"))
    }

    fn finish(&self) -> Result<(), TransportError> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(TransportError::malformed(format!(
                "{} trailing bytes",
                self.bytes.len() - self.pos
            )))
        }
    }
}
