//! Wire format between the orchestrator and worker processes
//!
//! Every message is one frame:
//! - Magic: `RBWORKER` (8 bytes)
//! - Version: u16 (little-endian)
//! - Payload length: u32 (little-endian)
//! - Payload: CBOR encoding of the message
//!
//! The orchestrator writes a single [`WorkerJob`] frame to the worker's stdin;
//! the worker answers with a stream of [`WorkerMessage`] frames on stdout,
//! ending with `Finished` or `Failed`.

use std::io::{ErrorKind, Read, Write};

use libroadbench_core::evaluation::{EvaluatorSet, TerminalConditions};
use libroadbench_core::{BenchmarkConfig, BenchmarkResult, RunSettings};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::error::ParallelError;
use crate::{Result, WIRE_VERSION};

/// Magic bytes at start of every frame
pub const FRAME_MAGIC: &[u8; 8] = b"RBWORKER";

/// Header size: magic + version + length
pub const FRAME_HEADER_LEN: usize = 8 + 2 + 4;

/// Upper bound on a single payload
pub const MAX_FRAME_LEN: u32 = 256 * 1024 * 1024;

/// Everything a worker needs to run its shard
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkerJob {
    pub worker_id: usize,
    pub evaluators: EvaluatorSet,
    pub terminal_when: TerminalConditions,
    pub settings: RunSettings,
    pub configs: Vec<BenchmarkConfig>,
}

/// Messages sent from a worker back to the orchestrator
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum WorkerMessage {
    Started {
        worker_id: usize,
        configs: usize,
    },
    ConfigFinished {
        worker_id: usize,
        config_idx: usize,
        steps: u64,
        terminal: bool,
        elapsed_us: u64,
    },
    Finished {
        worker_id: usize,
        result: BenchmarkResult,
    },
    Failed {
        worker_id: usize,
        message: String,
    },
}

/// Encode a value as one frame
pub fn encode_frame<T: Serialize>(value: &T) -> Result<Vec<u8>> {
    let mut payload = Vec::new();
    ciborium::into_writer(value, &mut payload)
        .map_err(|e| ParallelError::Cbor(format!("Failed to encode frame: {}", e)))?;

    let len = u32::try_from(payload.len())
        .ok()
        .filter(|len| *len <= MAX_FRAME_LEN)
        .ok_or_else(|| ParallelError::Protocol(format!("Frame too large: {} bytes", payload.len())))?;

    let mut buf = Vec::with_capacity(FRAME_HEADER_LEN + payload.len());
    buf.extend_from_slice(FRAME_MAGIC);
    buf.extend_from_slice(&WIRE_VERSION.to_le_bytes());
    buf.extend_from_slice(&len.to_le_bytes());
    buf.extend_from_slice(&payload);
    Ok(buf)
}

/// Decode a buffer holding exactly one frame
pub fn decode_frame<T: DeserializeOwned>(data: &[u8]) -> Result<T> {
    let mut reader = data;
    let value = read_frame(&mut reader)?
        .ok_or_else(|| ParallelError::Protocol("Empty frame buffer".to_string()))?;
    if !reader.is_empty() {
        return Err(ParallelError::Protocol(format!(
            "{} trailing bytes after frame",
            reader.len()
        )));
    }
    Ok(value)
}

/// Write one frame and flush
pub fn write_frame<W: Write, T: Serialize>(writer: &mut W, value: &T) -> Result<()> {
    let frame = encode_frame(value)?;
    writer.write_all(&frame)?;
    writer.flush()?;
    Ok(())
}

/// Read the next frame; `None` on a clean end of stream
pub fn read_frame<R: Read, T: DeserializeOwned>(reader: &mut R) -> Result<Option<T>> {
    let mut header = [0u8; FRAME_HEADER_LEN];
    let filled = read_full(reader, &mut header)?;
    if filled == 0 {
        return Ok(None);
    }
    if filled < FRAME_HEADER_LEN {
        return Err(ParallelError::Protocol("Frame truncated in header".to_string()));
    }

    if &header[0..8] != FRAME_MAGIC {
        return Err(ParallelError::Protocol("Invalid magic bytes".to_string()));
    }

    let version = u16::from_le_bytes([header[8], header[9]]);
    if version != WIRE_VERSION {
        return Err(ParallelError::VersionMismatch {
            expected: WIRE_VERSION,
            actual: version,
        });
    }

    let len = u32::from_le_bytes([header[10], header[11], header[12], header[13]]);
    if len > MAX_FRAME_LEN {
        return Err(ParallelError::Protocol(format!("Frame too large: {} bytes", len)));
    }

    let mut payload = vec![0u8; len as usize];
    if read_full(reader, &mut payload)? < payload.len() {
        return Err(ParallelError::Protocol("Frame truncated in payload".to_string()));
    }

    let value = ciborium::from_reader(payload.as_slice())
        .map_err(|e| ParallelError::Cbor(format!("Failed to decode frame: {}", e)))?;
    Ok(Some(value))
}

/// Fill `buf` as far as the stream allows, returning the bytes read
fn read_full<R: Read>(reader: &mut R, buf: &mut [u8]) -> Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        match reader.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == ErrorKind::Interrupted => continue,
            Err(e) => return Err(e.into()),
        }
    }
    Ok(filled)
}

#[cfg(test)]
mod tests {
    use super::*;
    use libroadbench_core::evaluation::{EvaluatorKind, Predicate};
    use libroadbench_core::{
        Agent, AgentState, BehaviorConfig, BehaviorModel, Bounds, EvalValue, ResultRow, Scenario,
    };
    use std::collections::BTreeMap;

    fn config(config_idx: usize) -> BenchmarkConfig {
        BenchmarkConfig {
            config_idx,
            behavior_config: BehaviorConfig::new(
                "accelerate",
                BehaviorModel::ConstantAcceleration {
                    acceleration: 1.5,
                    max_velocity: 20.0,
                },
            ),
            scenario: Scenario {
                agents: vec![Agent::new(1, AgentState::new(5060.5, 5101.75, 0.0, 9.25), BehaviorModel::ConstantVelocity)],
                ego_id: 1,
                goal: Bounds::new(5145.0, 5160.0, 5100.0, 5103.5),
                map_bounds: Bounds::new(5060.0, 5160.0, 5100.0, 5107.0),
            },
            scenario_idx: 2,
            scenario_set_name: "highway_merge".to_string(),
        }
    }

    fn job() -> WorkerJob {
        let mut evaluators = EvaluatorSet::new();
        evaluators.insert("collision".to_string(), EvaluatorKind::Collision);
        evaluators.insert("step".to_string(), EvaluatorKind::StepCount);
        let mut terminal_when = TerminalConditions::new();
        terminal_when.insert("collision".to_string(), Predicate::IsTrue);
        terminal_when.insert("step".to_string(), Predicate::GreaterThan(40.0));

        WorkerJob {
            worker_id: 3,
            evaluators,
            terminal_when,
            settings: RunSettings::default(),
            configs: vec![config(3), config(7)],
        }
    }

    #[test]
    fn test_job_frame_preserves_configs() {
        let frame = encode_frame(&job()).unwrap();
        assert_eq!(&frame[0..8], FRAME_MAGIC);

        let decoded: WorkerJob = decode_frame(&frame).unwrap();
        assert_eq!(decoded, job());
    }

    #[test]
    fn test_message_stream() {
        let mut evaluations = BTreeMap::new();
        evaluations.insert("collision".to_string(), EvalValue::Bool(false));
        evaluations.insert("step".to_string(), EvalValue::Int(41));
        evaluations.insert("velocity".to_string(), EvalValue::Float(12.5));
        let row = ResultRow {
            config_idx: 3,
            scen_set: "highway_merge".to_string(),
            scen_idx: 2,
            behavior: "accelerate".to_string(),
            step: 41,
            terminal: vec!["step".to_string()],
            max_steps_reached: false,
            evaluations,
        };

        let messages = vec![
            WorkerMessage::Started { worker_id: 3, configs: 1 },
            WorkerMessage::ConfigFinished {
                worker_id: 3,
                config_idx: 3,
                steps: 41,
                terminal: true,
                elapsed_us: 1200,
            },
            WorkerMessage::Finished {
                worker_id: 3,
                result: BenchmarkResult::new(vec![row], vec![config(3)]),
            },
        ];

        let mut stream = Vec::new();
        for message in &messages {
            write_frame(&mut stream, message).unwrap();
        }

        let mut reader = stream.as_slice();
        let mut decoded = Vec::new();
        while let Some(message) = read_frame::<_, WorkerMessage>(&mut reader).unwrap() {
            decoded.push(message);
        }
        assert_eq!(decoded, messages);
    }

    #[test]
    fn test_bad_magic_rejected() {
        let mut frame = encode_frame(&job()).unwrap();
        frame[0] = b'X';
        let err = decode_frame::<WorkerJob>(&frame).unwrap_err();
        assert!(matches!(err, ParallelError::Protocol(_)));
    }

    #[test]
    fn test_version_mismatch_rejected() {
        let mut frame = encode_frame(&job()).unwrap();
        frame[8..10].copy_from_slice(&(WIRE_VERSION + 1).to_le_bytes());
        let err = decode_frame::<WorkerJob>(&frame).unwrap_err();
        assert!(matches!(err, ParallelError::VersionMismatch { .. }));
    }

    #[test]
    fn test_truncated_payload_rejected() {
        let frame = encode_frame(&job()).unwrap();
        let err = decode_frame::<WorkerJob>(&frame[..frame.len() - 4]).unwrap_err();
        assert!(matches!(err, ParallelError::Protocol(_)));
    }

    #[test]
    fn test_empty_stream_is_end() {
        let mut reader: &[u8] = &[];
        assert!(read_frame::<_, WorkerMessage>(&mut reader).unwrap().is_none());
    }
}
