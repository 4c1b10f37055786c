use chrono::{DateTime, TimeDelta};
use proptest::prelude::*;
use spike_telemetry::codec::{self, DecodeError};
use spike_telemetry::record::{Cycle, Envelope, Message, Session, Timestamp};
use spike_telemetry::session::SessionHandle;
use spike_telemetry::validate;

fn timestamp() -> impl Strategy<Value = Timestamp> {
    (0i64..4_000_000_000, 0u32..1_000_000_000).prop_map(|(secs, nanos)| {
        let instant = DateTime::from_timestamp(secs, nanos).expect("in range");
        Timestamp::from_naive(instant.naive_utc())
    })
}

fn spikes() -> impl Strategy<Value = Vec<f64>> {
    prop::collection::vec(0.0f64..1e9, 0..6)
}

fn cycle() -> impl Strategy<Value = Cycle> {
    (
        (0.0f64..3.0).prop_filter("open interval", |v| *v > 0.0),
        0.0f64..1e12,
        spikes(),
        spikes(),
    )
        .prop_map(|(voltage, time, predicted, ground_truth)| {
            Cycle::new(voltage, time, predicted, ground_truth).expect("generated cycle is valid")
        })
}

fn envelope() -> impl Strategy<Value = Envelope> {
    (1u64..=u64::MAX, timestamp(), prop::collection::vec(cycle(), 1..10)).prop_map(
        |(sequence_id, received_at, cycles)| {
            let message = Message::new(cycles).expect("non-empty");
            Envelope::new(sequence_id, received_at, message).expect("generated envelope is valid")
        },
    )
}

fn closed_session(envelopes: &[Envelope]) -> Session {
    let start = Timestamp::parse("2025-11-21T12:00:00").expect("timestamp");
    let session = SessionHandle::open("192.168.1.20", 5005, start);
    for envelope in envelopes {
        let raw = serde_json::to_value(envelope).expect("envelope value");
        session.accept(&raw).expect("accepted");
    }
    let end = start.checked_add(TimeDelta::milliseconds(12_345)).expect("in range");
    session.close(end).expect("close")
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(1024))]

    #[test]
    fn prop_envelope_round_trip(envelope in envelope()) {
        let text = codec::encode(&envelope).expect("encode");
        let decoded: Envelope = codec::decode(&text).expect("decode");
        prop_assert_eq!(&decoded, &envelope);

        // the untrusted path must agree with the trusted one
        let raw = codec::decode_raw(&text).expect("decode raw");
        prop_assert_eq!(&validate::validate(&raw).expect("valid"), &envelope);

        prop_assert_eq!(codec::encode(&decoded).expect("re-encode"), text);
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn prop_session_round_trip(envelopes in prop::collection::vec(envelope(), 0..6)) {
        let session = closed_session(&envelopes);
        let text = codec::encode(&session).expect("encode");

        let decoded: Session = codec::decode(&text).expect("decode");
        prop_assert_eq!(&decoded, &session);

        let reloaded = validate::parse_and_validate_session(&text).expect("archive reloads");
        prop_assert_eq!(&reloaded, &session);
    }
}

#[test]
fn test_float_edge_values_survive() {
    let cycle = Cycle::new(
        3.0 - f64::EPSILON * 2.0,
        0.1 + 0.2,
        vec![f64::MIN_POSITIVE, 1e-300, 123456789.123456789],
        vec![0.0, 1e300],
    )
    .expect("valid cycle");
    let envelope = Envelope::new(
        u64::MAX,
        Timestamp::parse("2025-11-21T12:34:56.000000001").expect("timestamp"),
        Message::new(vec![cycle]).expect("message"),
    )
    .expect("envelope");

    let decoded: Envelope = codec::decode(&codec::encode(&envelope).expect("encode")).expect("decode");
    let (original, restored) = (&envelope.message().cycles()[0], &decoded.message().cycles()[0]);
    assert_eq!(original.voltage().to_bits(), restored.voltage().to_bits());
    assert_eq!(original.time().to_bits(), restored.time().to_bits());
    assert_eq!(original.predicted_spikes(), restored.predicted_spikes());
    assert_eq!(decoded.received_at(), envelope.received_at());
}

#[test]
fn test_pretty_output_decodes_to_same_value() {
    let session = closed_session(&[]);
    let pretty = codec::encode_pretty(&session).expect("pretty");
    assert!(pretty.contains('\n'));
    assert_ne!(pretty, codec::encode(&session).expect("compact"));

    let decoded: Session = codec::decode(&pretty).expect("decode");
    assert_eq!(decoded, session);
}

#[test]
fn test_decode_errors_carry_position() {
    match codec::decode::<Session>("{\n  \"summary\": ]") {
        Err(DecodeError::Syntax { line, column, .. }) => {
            assert_eq!(line, 2);
            assert!(column > 0);
        }
        other => panic!("expected a syntax error, got {other:?}"),
    }

    assert!(matches!(
        codec::decode_raw("not json"),
        Err(DecodeError::Syntax { .. })
    ));
}
