use crate::alarm::{Alarm, AlarmConfig};
use crate::condition::{evaluate, paraphrase, parse};
use crate::engine::AlarmEngine;
use crate::error::{ConfigError, EngineError, ParseError};
use crate::state::{AlarmState, Phase, Tick};
use chrono::{Duration, TimeZone, Utc};
use serde_json::json;
use wxalarm_common::channel::ChannelValidationError;
use wxalarm_common::types::Observation;

fn weather(temperature: f64, humidity: f64) -> Observation {
    Observation {
        temperature,
        humidity,
        ..Default::default()
    }
}

fn lightning(count: u32) -> Observation {
    Observation {
        lightning_count: count,
        ..Default::default()
    }
}

fn f_to_c(f: f64) -> f64 {
    (f - 32.0) * 5.0 / 9.0
}

fn console_alarm(name: &str, condition: &str, cooldown: u64) -> Alarm {
    serde_json::from_value(json!({
        "name": name,
        "enabled": true,
        "condition": condition,
        "cooldown": cooldown,
        "channels": [{"type": "console", "template": "{{alarm_name}}"}]
    }))
    .unwrap()
}

fn engine_with(alarms: Vec<Alarm>) -> AlarmEngine {
    AlarmEngine::from_config(&AlarmConfig { alarms }).unwrap()
}

#[test]
fn fahrenheit_and_celsius_literals_agree() {
    for f in [-40.0, 0.0, 32.0, 70.5, 85.0, 104.0] {
        let in_f = parse(&format!("temperature > {f}F")).unwrap();
        let in_c = parse(&format!("temperature > {}C", f_to_c(f))).unwrap();
        for t in [-45.0, -10.0, 0.0, 21.0, 29.4, 29.5, 35.0, 41.0] {
            let obs = weather(t, 50.0);
            let state = AlarmState::default();
            assert_eq!(
                evaluate(&in_f, &obs, &state).unwrap(),
                evaluate(&in_c, &obs, &state).unwrap(),
                "{f}F vs {t}C"
            );
        }
    }
}

#[test]
fn malformed_conditions_fail_to_parse() {
    for src in ["", "&& x", "x &&", "x && && y"] {
        assert!(parse(src).is_err(), "{src:?} should not parse");
    }
    assert!(parse("temperature > 85F").is_ok());
}

#[test]
fn compound_condition_scenario() {
    let expr = parse("temperature > 85F && humidity < 40").unwrap();
    let state = AlarmState::default();
    assert!(evaluate(&expr, &weather(32.2, 35.0), &state).unwrap());
    assert!(!evaluate(&expr, &weather(f_to_c(90.0), 45.0), &state).unwrap());
}

#[test]
fn mixed_connectives_evaluate_left_to_right() {
    // Read as (humidity > 90 || humidity < 10) && temperature > 100.
    let expr = parse("humidity > 90 || humidity < 10 && temperature > 100").unwrap();
    let state = AlarmState::default();
    assert!(!evaluate(&expr, &weather(20.0, 95.0), &state).unwrap());
}

#[test]
fn change_detection_needs_a_baseline() {
    let expr = parse("*lightning_count").unwrap();
    let mut state = AlarmState::default();
    let now = Utc::now();

    let results: Vec<bool> = [0, 0, 3]
        .into_iter()
        .map(|count| {
            matches!(
                state.tick(&expr, Duration::zero(), true, &lightning(count), now),
                Tick::Fired { .. }
            )
        })
        .collect();
    assert_eq!(results, [false, false, true]);
}

#[test]
fn change_detection_is_false_on_first_evaluation_even_if_changed() {
    let expr = parse(">temperature").unwrap();
    let state = AlarmState::default();
    assert!(!evaluate(&expr, &weather(50.0, 0.0), &state).unwrap());

    let state = AlarmState {
        previous_observation: Some(weather(10.0, 0.0)),
        ..Default::default()
    };
    assert!(evaluate(&expr, &weather(11.0, 0.0), &state).unwrap());
    assert!(!evaluate(&parse("<temperature").unwrap(), &weather(11.0, 0.0), &state).unwrap());
}

#[test]
fn cooldown_suppresses_refiring_until_it_expires() {
    let expr = parse("temperature > 30").unwrap();
    let mut state = AlarmState::default();
    let cooldown = Duration::seconds(300);
    let t0 = Utc.with_ymd_and_hms(2024, 7, 1, 12, 0, 0).unwrap();
    let hot = weather(35.0, 20.0);

    assert!(matches!(state.tick(&expr, cooldown, true, &hot, t0), Tick::Fired { .. }));
    assert_eq!(state.phase(t0), Phase::Cooldown);
    for secs in [1, 60, 299] {
        let now = t0 + Duration::seconds(secs);
        assert_eq!(state.tick(&expr, cooldown, true, &hot, now), Tick::CoolingDown);
    }
    let later = t0 + Duration::seconds(300);
    assert!(matches!(state.tick(&expr, cooldown, true, &hot, later), Tick::Fired { .. }));
    assert_eq!(state.triggered_count, 2);
    assert_eq!(state.last_triggered, Some(later));
}

#[test]
fn baseline_is_kept_current_through_cooldown() {
    let expr = parse(">rain_rate").unwrap();
    let mut state = AlarmState::default();
    let cooldown = Duration::seconds(60);
    let t0 = Utc.with_ymd_and_hms(2024, 7, 1, 12, 0, 0).unwrap();
    let rain = |rate: f64| Observation {
        rain_rate: rate,
        ..Default::default()
    };

    state.tick(&expr, cooldown, true, &rain(0.0), t0);
    assert!(matches!(
        state.tick(&expr, cooldown, true, &rain(1.0), t0 + Duration::seconds(10)),
        Tick::Fired { .. }
    ));
    // Rises during cooldown are absorbed into the baseline.
    state.tick(&expr, cooldown, true, &rain(5.0), t0 + Duration::seconds(30));
    // After cooldown a steady rate does not count as an increase.
    assert_eq!(
        state.tick(&expr, cooldown, true, &rain(5.0), t0 + Duration::seconds(90)),
        Tick::NotMet
    );
}

#[test]
fn paraphrase_is_deterministic() {
    for src in [
        "temperature > 85F && humidity < 40",
        "*lightning_count || rain_rate > 10",
        "wind_gust >= 40mph",
    ] {
        let a = paraphrase(&parse(src).unwrap());
        let b = paraphrase(&parse(src).unwrap());
        assert_eq!(a, b);
    }
}

#[test]
fn config_validation_reports_first_problem() {
    let err = AlarmConfig::from_json(r#"{"alarms":[{"name":"","condition":"uv > 3"}]}"#)
        .unwrap_err();
    assert!(matches!(err, ConfigError::MissingName(0)));

    let dup = json!({"alarms": [
        console_alarm("a", "uv > 3", 0),
        console_alarm("a", "uv > 4", 0)
    ]});
    assert!(matches!(
        AlarmConfig::from_json(&dup.to_string()),
        Err(ConfigError::DuplicateName(name)) if name == "a"
    ));

    let bad_condition = json!({"alarms": [console_alarm("a", "uv >", 0)]});
    assert!(matches!(
        AlarmConfig::from_json(&bad_condition.to_string()),
        Err(ConfigError::Condition { source: ParseError::MissingValue(_), .. })
    ));

    let no_channels = json!({"alarms": [{"name": "a", "condition": "uv > 3"}]});
    assert!(matches!(
        AlarmConfig::from_json(&no_channels.to_string()),
        Err(ConfigError::NoChannels(_))
    ));

    let bad_channel = json!({"alarms": [{
        "name": "a", "condition": "uv > 3",
        "channels": [
            {"type": "console"},
            {"type": "webhook", "webhook": {"url": "https://x.example", "headers": "not json", "body": "{}"}}
        ]
    }]});
    match AlarmConfig::from_json(&bad_channel.to_string()) {
        Err(ConfigError::Channel { index, source, .. }) => {
            assert_eq!(index, 1);
            assert!(matches!(source, ChannelValidationError::InvalidHeaders(_)));
        }
        other => panic!("expected channel error, got {other:?}"),
    }
}

#[test]
fn empty_alarm_list_is_valid() {
    let config = AlarmConfig::from_json(r#"{"alarms": []}"#).unwrap();
    assert!(config.alarms.is_empty());
}

#[test]
fn inline_path_gets_a_hint() {
    let err = AlarmConfig::from_json("config/alarms.json").unwrap_err();
    let msg = err.to_string();
    assert!(msg.contains("@config/alarms.json"), "{msg}");
}

#[test]
fn load_reads_at_prefixed_files() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("alarms.json");
    let doc = json!({"alarms": [console_alarm("hot", "temp > 90F", 600)]});
    std::fs::write(&path, doc.to_string()).unwrap();

    let config = AlarmConfig::load(&format!("@{}", path.display())).unwrap();
    assert_eq!(config.alarms.len(), 1);
    assert_eq!(config.alarms[0].cooldown, 600);

    let missing = AlarmConfig::load("@/definitely/not/here.json").unwrap_err();
    assert!(matches!(missing, ConfigError::Io { .. }));
}

#[tokio::test]
async fn engine_fires_once_per_cooldown_window() {
    let engine = engine_with(vec![console_alarm("hot", "temperature > 30", 300)]);
    let t0 = Utc.with_ymd_and_hms(2024, 7, 1, 12, 0, 0).unwrap();
    let hot = weather(35.0, 20.0);

    let firings = engine.process(&hot, t0).await;
    assert_eq!(firings.len(), 1);
    assert_eq!(firings[0].alarm.name, "hot");
    assert_eq!(firings[0].triggered_count, 1);
    assert!(firings[0].previous.is_none());

    assert!(engine.process(&hot, t0 + Duration::seconds(120)).await.is_empty());
    let again = engine.process(&hot, t0 + Duration::seconds(301)).await;
    assert_eq!(again.len(), 1);
    assert_eq!(again[0].triggered_count, 2);
    assert_eq!(again[0].previous, Some(hot));
}

#[tokio::test]
async fn engine_skips_disabled_alarms_and_orders_firings() {
    let mut disabled = console_alarm("off", "humidity >= 0", 0);
    disabled.enabled = false;
    let engine = engine_with(vec![
        console_alarm("first", "humidity >= 0", 0),
        disabled,
        console_alarm("third", "temperature > -100", 0),
    ]);
    let names: Vec<String> = engine
        .process(&weather(20.0, 50.0), Utc::now())
        .await
        .into_iter()
        .map(|f| f.alarm.name.to_string())
        .collect();
    assert_eq!(names, ["first", "third"]);
}

#[tokio::test]
async fn engine_isolates_evaluation_errors() {
    let engine = engine_with(vec![
        console_alarm("broken", "temperature > 0", 0),
        console_alarm("fine", "humidity > 10", 0),
    ]);
    let obs = Observation {
        temperature: f64::NAN,
        humidity: 50.0,
        ..Default::default()
    };
    let firings = engine.process(&obs, Utc::now()).await;
    assert_eq!(firings.len(), 1);
    assert_eq!(firings[0].alarm.name, "fine");
}

#[tokio::test]
async fn replace_alarms_keeps_state_for_unchanged_definitions() {
    let unchanged = console_alarm("steady", "temperature > 30", 600);
    let edited = console_alarm("edited", "temperature > 30", 600);
    let engine = engine_with(vec![unchanged.clone(), edited.clone()]);
    let t0 = Utc::now();
    assert_eq!(engine.process(&weather(35.0, 0.0), t0).await.len(), 2);

    let mut edited = edited;
    edited.cooldown = 0;
    let config = AlarmConfig {
        alarms: vec![unchanged, edited, console_alarm("new", "temperature > 30", 0)],
    };
    engine.replace_alarms(config.compile().unwrap()).await;

    let status = engine.status(t0).await;
    let by_name = |n: &str| status.iter().find(|s| s.name == n).unwrap();
    assert!(by_name("steady").in_cooldown);
    assert_eq!(by_name("steady").triggered_count, 1);
    assert!(by_name("steady").cooldown_remaining_secs > 0);
    assert_eq!(by_name("edited").triggered_count, 0);
    assert_eq!(by_name("new").phase, Phase::Idle);
    assert!(!by_name("new").has_baseline);

    let names: Vec<String> = engine
        .process(&weather(35.0, 0.0), t0 + Duration::seconds(1))
        .await
        .into_iter()
        .map(|f| f.alarm.name.to_string())
        .collect();
    assert_eq!(names, ["edited", "new"]);
}

#[tokio::test]
async fn evaluate_now_shares_state_with_process() {
    let engine = engine_with(vec![console_alarm("strikes", "*lightning_count", 0)]);
    let now = Utc::now();
    assert!(engine.process(&lightning(0), now).await.is_empty());
    let manual = engine.evaluate_now("strikes", &lightning(2), now).await.unwrap();
    assert!(manual.is_some());

    assert_eq!(
        engine.evaluate_now("nope", &lightning(2), now).await.unwrap_err(),
        EngineError::UnknownAlarm("nope".into())
    );
}

#[tokio::test]
async fn schedule_gates_firing() {
    let mut alarm = console_alarm("never", "humidity >= 0", 0);
    // Wednesdays only; the instant below is a weekend in every zone.
    alarm.schedule = Some(
        serde_json::from_value(json!({
            "type": "weekly", "days_of_week": [3], "start_time": "00:00", "end_time": "00:01"
        }))
        .unwrap(),
    );
    let engine = engine_with(vec![alarm]);
    let now = Utc.with_ymd_and_hms(2024, 7, 6, 12, 0, 0).unwrap();
    assert!(engine.process(&weather(20.0, 50.0), now).await.is_empty());
    let status = engine.status(now).await;
    assert!(status[0].has_baseline);
    assert_eq!(status[0].triggered_count, 0);
    assert_eq!(status[0].schedule, "Wednesday from 00:00 to 00:01");
}
