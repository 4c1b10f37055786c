use crate::record::{Envelope, Session};

/// Per-message figures logged by the ingestion loop.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MessageStats {
    pub sequence_id: u64,
    pub cycle_count: usize,
    pub voltage_min: f64,
    pub voltage_max: f64,
    pub voltage_mean: f64,
    pub time_min: f64,
    pub time_max: f64,
    /// Ground-truth spikes across all cycles.
    pub spike_count: usize,
}

impl MessageStats {
    pub fn of(envelope: &Envelope) -> Self {
        let cycles = envelope.message().cycles();
        let mut stats = MessageStats {
            sequence_id: envelope.sequence_id(),
            cycle_count: cycles.len(),
            ..Default::default()
        };

        // Decoded (trusted) envelopes are not re-validated and may be empty.
        let Some(first) = cycles.first() else {
            return stats;
        };

        stats.voltage_min = first.voltage();
        stats.voltage_max = first.voltage();
        stats.time_min = first.time();
        stats.time_max = first.time();
        let mut voltage_sum = 0.0;

        for cycle in cycles {
            stats.voltage_min = stats.voltage_min.min(cycle.voltage());
            stats.voltage_max = stats.voltage_max.max(cycle.voltage());
            stats.time_min = stats.time_min.min(cycle.time());
            stats.time_max = stats.time_max.max(cycle.time());
            stats.spike_count += cycle.ground_truth_spikes().len();
            voltage_sum += cycle.voltage();
        }

        stats.voltage_mean = voltage_sum / cycles.len() as f64;
        stats
    }
}

/// Whole-session figures, computed over every cycle of every envelope.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionStats {
    pub client_address: String,
    pub message_count: usize,
    pub cycle_count: usize,
    pub duration_seconds: Option<f64>,
    /// `None` when the session holds no cycles.
    pub voltage_min: Option<f64>,
    pub voltage_max: Option<f64>,
    pub voltage_mean: Option<f64>,
    pub spike_count: usize,
}

impl SessionStats {
    pub fn of(session: &Session) -> Self {
        let summary = session.summary();
        let cycles = session
            .messages()
            .iter()
            .flat_map(|envelope| envelope.message().cycles());

        let mut cycle_count = 0;
        let mut spike_count = 0;
        let mut voltage_sum = 0.0;
        let mut voltage_range: Option<(f64, f64)> = None;
        for cycle in cycles {
            let voltage = cycle.voltage();
            cycle_count += 1;
            spike_count += cycle.ground_truth_spikes().len();
            voltage_sum += voltage;
            voltage_range = Some(match voltage_range {
                Some((min, max)) => (min.min(voltage), max.max(voltage)),
                None => (voltage, voltage),
            });
        }

        SessionStats {
            client_address: summary.client_address().to_string(),
            message_count: session.messages().len(),
            cycle_count,
            duration_seconds: summary.duration_seconds(),
            voltage_min: voltage_range.map(|(min, _)| min),
            voltage_max: voltage_range.map(|(_, max)| max),
            voltage_mean: voltage_range.map(|_| voltage_sum / cycle_count as f64),
            spike_count,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{MessageStats, SessionStats};
    use crate::record::{Cycle, Envelope, Message, Timestamp};
    use crate::session::SessionHandle;

    #[test]
    fn summarizes_cycles() {
        let cycles = vec![
            Cycle::new(1.0, 100.0, vec![], vec![90.0]).expect("valid cycle"),
            Cycle::new(2.0, 300.0, vec![250.0], vec![]).expect("valid cycle"),
            Cycle::new(1.5, 200.0, vec![], vec![150.0, 160.0]).expect("valid cycle"),
        ];
        let envelope = Envelope::new(
            7,
            Timestamp::parse("2025-11-21T12:34:05").expect("timestamp"),
            Message::new(cycles).expect("valid message"),
        )
        .expect("valid envelope");

        let stats = MessageStats::of(&envelope);
        assert_eq!(stats.sequence_id, 7);
        assert_eq!(stats.cycle_count, 3);
        assert_eq!(stats.voltage_min, 1.0);
        assert_eq!(stats.voltage_max, 2.0);
        assert_eq!(stats.voltage_mean, 1.5);
        assert_eq!(stats.time_min, 100.0);
        assert_eq!(stats.time_max, 300.0);
        assert_eq!(stats.spike_count, 3);
    }

    #[test]
    fn session_stats_span_all_messages() {
        let start = Timestamp::parse("2025-11-21T12:00:00").expect("timestamp");
        let handle = SessionHandle::open("10.0.0.5", 9000, start);
        let frames = [
            serde_json::json!([
                { "voltage": 0.5, "time": 1.0, "ground_truth_spikes": [0.5] },
                { "voltage": 2.5, "time": 2.0 },
            ]),
            serde_json::json!([{ "voltage": 1.5, "time": 3.0, "ground_truth_spikes": [2.5, 2.75] }]),
        ];
        for (index, cycles) in frames.into_iter().enumerate() {
            let raw = serde_json::json!({
                "sequence_id": index + 1,
                "received_at": "2025-11-21T12:00:01",
                "message": { "cycles": cycles },
            });
            handle.accept(&raw).expect("accepted");
        }
        let end = Timestamp::parse("2025-11-21T12:00:30").expect("timestamp");
        let session = handle.close(end).expect("close");

        let stats = SessionStats::of(&session);
        assert_eq!(stats.client_address, "10.0.0.5");
        assert_eq!(stats.message_count, 2);
        assert_eq!(stats.cycle_count, 3);
        assert_eq!(stats.duration_seconds, Some(30.0));
        assert_eq!(stats.voltage_min, Some(0.5));
        assert_eq!(stats.voltage_max, Some(2.5));
        assert_eq!(stats.voltage_mean, Some(1.5));
        assert_eq!(stats.spike_count, 3);
    }

    #[test]
    fn empty_session_has_no_voltage_figures() {
        let start = Timestamp::parse("2025-11-21T12:00:00").expect("timestamp");
        let end = Timestamp::parse("2025-11-21T12:00:05").expect("timestamp");
        let session = SessionHandle::open("10.0.0.5", 9000, start)
            .close(end)
            .expect("close");

        let stats = SessionStats::of(&session);
        assert_eq!(stats.message_count, 0);
        assert_eq!(stats.cycle_count, 0);
        assert_eq!(stats.duration_seconds, Some(5.0));
        assert!(stats.voltage_min.is_none());
        assert!(stats.voltage_max.is_none());
        assert!(stats.voltage_mean.is_none());
        assert_eq!(stats.spike_count, 0);
    }
}
