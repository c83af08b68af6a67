mod common;

use common::{default_calls, ClockCall, RecordingClock, ScriptedTimeSource};
use pretty_assertions::assert_eq;
use std::time::{Duration, Instant};
use word_clock_config::controller::ROOT_PAGE;
use word_clock_config::portal::{
    AP_ADDRESS, HTTP_BAD_REQUEST, HTTP_FOUND, HTTP_NOT_FOUND, HTTP_OK, HTTP_SERVICE_UNAVAILABLE,
    INITIAL_AP_PASSWORD,
};
use word_clock_config::*;

type TestController = Controller<RecordingClock, MemoryPortal, ScriptedTimeSource, LoggedPin>;

fn controller_with(portal: MemoryPortal, answers: &[bool]) -> TestController {
    let synchronizer = NtpSynchronizer::new(
        ScriptedTimeSource::answering(answers),
        LoggedPin::new(NTP_STATUS_PIN),
        NtpConfig::default(),
    );
    Controller::new(RecordingClock::new(), portal, synchronizer)
}

fn controller() -> TestController {
    controller_with(MemoryPortal::new(THING_NAME), &[true])
}

fn calls(controller: &TestController) -> &[ClockCall] {
    &controller.coordinator().clock().calls
}

// ── Setup ────────────────────────────────────────────────────────

#[test]
fn setup_registers_fields_and_applies_defaults() {
    let mut controller = controller();
    controller.setup().unwrap();

    assert!(controller.is_initialized());
    assert_eq!(controller.portal().registered_fields().len(), FIELDS.len());
    assert_eq!(calls(&controller), default_calls().as_slice());
}

#[test]
fn second_setup_is_a_no_op() {
    let mut controller = controller();
    controller.setup().unwrap();
    controller.setup().unwrap();

    assert_eq!(controller.portal().registered_fields().len(), FIELDS.len());
    assert_eq!(calls(&controller).len(), default_calls().len());
}

#[test]
fn tick_before_setup_does_nothing() {
    let mut controller = controller();
    controller.portal_mut().connect_wifi();
    controller.tick(Instant::now());
    assert_eq!(controller.sync_state(), SyncState::Waiting);
    assert!(calls(&controller).is_empty());
}

#[test]
fn setup_drives_ntp_led_off() {
    let mut controller = controller();
    assert_eq!(controller.synchronizer().led().pin().writes, 0);

    controller.setup().unwrap();

    let pin = controller.synchronizer().led().pin();
    assert_eq!(pin.writes, 1);
    assert!(!pin.is_high());
    assert_eq!(controller.sync_state(), SyncState::Waiting);
}

#[test]
fn requests_before_setup_are_refused() {
    let mut controller = controller();

    let response = controller.handle_request(&Request::post("/config", "palette_id=3"));
    assert_eq!(response.status, HTTP_SERVICE_UNAVAILABLE);

    let response = controller.handle_request(&Request::get("/").with_host(AP_ADDRESS));
    assert_eq!(response.status, HTTP_SERVICE_UNAVAILABLE);

    assert!(calls(&controller).is_empty());
    assert_eq!(controller.coordinator().fields().get(FieldId::PaletteId), "1");
    assert!(controller.coordinator().applied().is_none());
}

#[test]
fn config_button_resets_ap_password() {
    let mut portal = MemoryPortal::with_config_button(THING_NAME, FixedPin { low: true });
    portal.set_ap_password("secret-password");
    let synchronizer = NtpSynchronizer::new(
        ScriptedTimeSource::answering(&[true]),
        LoggedPin::new(NTP_STATUS_PIN),
        NtpConfig::default(),
    );
    let mut controller = Controller::new(RecordingClock::new(), portal, synchronizer);
    controller.setup().unwrap();
    assert_eq!(controller.portal().ap_password(), INITIAL_AP_PASSWORD);
}

#[test]
fn released_button_keeps_ap_password() {
    let mut portal = MemoryPortal::new(THING_NAME);
    portal.set_ap_password("secret-password");
    let mut controller = controller_with(portal, &[true]);
    controller.setup().unwrap();
    assert_eq!(controller.portal().ap_password(), "secret-password");
}

// ── HTTP surface ─────────────────────────────────────────────────

#[test]
fn root_serves_link_page() {
    let mut controller = controller();
    controller.setup().unwrap();

    let response = controller.handle_request(&Request::get("/").with_host(AP_ADDRESS));
    assert_eq!(response.status, HTTP_OK);
    assert_eq!(response.body, ROOT_PAGE);
    assert!(response.body.contains("href='config'"));
}

#[test]
fn root_redirects_foreign_hosts() {
    let mut controller = controller();
    controller.setup().unwrap();

    let response =
        controller.handle_request(&Request::get("/").with_host("connectivitycheck.gstatic.com"));
    assert_eq!(response.status, HTTP_FOUND);
    assert_eq!(
        response.headers,
        vec![("Location", format!("http://{AP_ADDRESS}/"))]
    );
}

#[test]
fn unknown_paths_are_not_found() {
    let mut controller = controller();
    controller.setup().unwrap();
    let response = controller.handle_request(&Request::get("/favicon.ico"));
    assert_eq!(response.status, HTTP_NOT_FOUND);
}

#[test]
fn saving_config_applies_to_clock() {
    let mut controller = controller();
    controller.setup().unwrap();

    let response = controller.handle_request(&Request::post(
        "/config",
        "date=2026-10-16&time=07%3A45%3A00&palette_id=0&color_1=%23112233",
    ));
    assert_eq!(response.status, HTTP_OK);

    let applied = &calls(&controller)[default_calls().len()..];
    assert_eq!(applied[0], ClockCall::Adjust(ClockTime::new(2026, 10, 16, 7, 45, 0)));
    assert!(applied.contains(&ClockCall::Palette(0)));
    assert!(applied.contains(&ClockCall::Color1(RgbColor::new(0x11, 0x22, 0x33))));
    assert_eq!(controller.coordinator().applied().unwrap().palette_id, 0);
}

#[test]
fn viewing_config_clears_transient_fields() {
    let mut controller = controller();
    controller.setup().unwrap();
    controller.handle_request(&Request::post("/config", "time=07%3A45%3A00&period=1"));

    let response = controller.handle_request(&Request::get("/config"));
    assert_eq!(response.status, HTTP_OK);

    let fields = controller.coordinator().fields();
    assert_eq!(fields.get(FieldId::Time), "");
    assert_eq!(fields.get(FieldId::Period), "1");
    assert!(response.body.contains("name='period' value='1'"));
}

#[test]
fn transient_values_do_not_reapply_on_next_save() {
    let mut controller = controller();
    controller.setup().unwrap();
    controller.handle_request(&Request::post("/config", "time=07%3A45%3A00"));
    let before = calls(&controller).len();

    controller.handle_request(&Request::post("/config", "dst=1"));

    let second_save = &calls(&controller)[before..];
    assert!(!second_save
        .iter()
        .any(|call| matches!(call, ClockCall::Adjust(_))));
    assert!(second_save.contains(&ClockCall::Dst(true)));
}

#[test]
fn only_persistent_fields_are_stored() {
    let mut controller = controller();
    controller.setup().unwrap();
    controller.handle_request(&Request::post("/config", "date=2026-01-01&palette_id=3"));

    let portal = controller.portal();
    assert_eq!(portal.stored("palette_id"), Some("3"));
    assert_eq!(portal.stored("date"), None);
}

#[test]
fn over_long_submission_is_rejected_without_saving() {
    let mut controller = controller();
    controller.setup().unwrap();
    let before = calls(&controller).len();

    let response = controller.handle_request(&Request::post(
        "/config",
        "palette_id=2&color_1=%23000000000000000000",
    ));

    assert_eq!(response.status, HTTP_BAD_REQUEST);
    assert_eq!(calls(&controller).len(), before);
    assert_eq!(controller.coordinator().fields().get(FieldId::PaletteId), "1");
}

// ── Loop ─────────────────────────────────────────────────────────

#[test]
fn wifi_connection_drives_ntp_sync() {
    let mut controller = controller_with(MemoryPortal::new(THING_NAME), &[false, false, true]);
    controller.setup().unwrap();

    let start = Instant::now();
    controller.tick(start);
    assert_eq!(controller.sync_state(), SyncState::Waiting);

    controller.portal_mut().connect_wifi();
    controller.tick(start + Duration::from_millis(10));
    assert_eq!(controller.sync_state(), SyncState::Connecting);
    assert!(!controller.synchronizer().led().is_high());

    controller.tick(start + Duration::from_millis(20));
    assert_eq!(controller.sync_state(), SyncState::Connecting);
    assert!(controller.synchronizer().led().is_high());

    controller.tick(start + Duration::from_millis(30));
    assert_eq!(controller.sync_state(), SyncState::Connected);

    controller.tick(start + Duration::from_millis(40));
    assert!(controller.synchronizer().led().is_high());
    assert_eq!(controller.synchronizer().source().starts.len(), 1);
}

#[test]
fn restored_values_survive_restart() {
    let mut first = controller();
    first.setup().unwrap();
    first.handle_request(&Request::post(
        "/config",
        "palette_id=6&fast_time_factor=120&date=2030-01-01",
    ));

    let mut second = controller_with(first.portal().reboot(), &[true]);
    second.setup().unwrap();

    let settings = second.coordinator().applied().unwrap();
    assert_eq!(settings.palette_id, 6);
    assert_eq!(settings.fast_time_factor, 120);
    assert_eq!(second.coordinator().fields().get(FieldId::Date), "");

    let mut expected = default_calls();
    expected[2] = ClockCall::FastTimeFactor(120);
    expected[3] = ClockCall::Palette(6);
    assert_eq!(calls(&second), expected.as_slice());
}
