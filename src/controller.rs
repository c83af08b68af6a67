//! Single-threaded owner of the configuration portal loop.
//!
//! All mutable state (field buffers, applied settings, sync state) lives
//! here and is only touched from [`Controller::tick`] and
//! [`Controller::handle_request`]. Portal callbacks arrive as
//! [`PortalEvent`] values and are dispatched in the same context.

use crate::clock::WordClock;
use crate::config::ConfigCoordinator;
use crate::field::FIELDS;
use crate::ntp::{NtpSynchronizer, SyncState, TimeSource};
use crate::pins::{OutputPin, CONFIG_PIN, STATUS_PIN};
use crate::portal::{
    Portal, PortalEvent, Request, Response, HTTP_OK, HTTP_SERVICE_UNAVAILABLE, MIME_HTML,
    MIME_TEXT,
};
use crate::Result;
use std::time::Instant;
use tracing::{debug, error, info, instrument, warn};

/// Landing page linking to the settings form
pub const ROOT_PAGE: &str = "<!DOCTYPE html>\
<html lang='en'>\
<head>\
<meta name='viewport' content='width=device-width, initial-scale=1, user-scalable=no'/>\
<title>Word clock LT</title>\
</head>\
<body>\
<h1>Word Clock LT</h1>\
<ul><li><a href='config'>Settings</a></li></ul>\
</body>\
</html>\n";

pub struct Controller<C, P, S, L> {
    coordinator: ConfigCoordinator<C>,
    portal: P,
    synchronizer: NtpSynchronizer<S, L>,
    initialized: bool,
}

impl<C, P, S, L> Controller<C, P, S, L>
where
    C: WordClock,
    P: Portal,
    S: TimeSource,
    L: OutputPin,
{
    pub fn new(clock: C, portal: P, synchronizer: NtpSynchronizer<S, L>) -> Self {
        Self {
            coordinator: ConfigCoordinator::new(clock),
            portal,
            synchronizer,
            initialized: false,
        }
    }

    pub fn coordinator(&self) -> &ConfigCoordinator<C> {
        &self.coordinator
    }

    pub fn portal(&self) -> &P {
        &self.portal
    }

    pub fn portal_mut(&mut self) -> &mut P {
        &mut self.portal
    }

    pub fn synchronizer(&self) -> &NtpSynchronizer<S, L> {
        &self.synchronizer
    }

    pub fn sync_state(&self) -> SyncState {
        self.synchronizer.state()
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    /// Registers fields, starts the portal and applies the restored
    /// configuration. A second call only logs a warning.
    #[instrument(skip(self))]
    pub fn setup(&mut self) -> Result<()> {
        if self.initialized {
            warn!("Trying to set up the controller multiple times");
            return Ok(());
        }

        self.synchronizer.refresh_led(Instant::now());
        self.portal.set_config_pin(CONFIG_PIN);
        self.portal.set_status_pin(STATUS_PIN);
        for spec in FIELDS.iter() {
            self.portal.add_field(spec);
        }

        self.portal.init(self.coordinator.fields_mut())?;

        self.coordinator.reset_transient_fields();
        self.coordinator.apply_all_fields_to_clock();

        self.initialized = true;
        info!("Controller set up");
        Ok(())
    }

    /// One pass of the main loop
    pub fn tick(&mut self, now: Instant) {
        if !self.initialized {
            error!("Controller not initialized, loop aborted");
            return;
        }

        self.synchronizer.tick(now);

        for event in self.portal.do_loop() {
            self.dispatch(event);
        }
    }

    /// Routes a request the way the device web server does
    #[instrument(skip(self, request), fields(path = %request.path))]
    pub fn handle_request(&mut self, request: &Request) -> Response {
        if !self.initialized {
            error!("Controller not initialized, request refused");
            return Response::new(HTTP_SERVICE_UNAVAILABLE, MIME_TEXT, "Not ready");
        }

        match request.path.as_str() {
            "/" => {
                if let Some(response) = self.portal.handle_captive_portal(request) {
                    return response;
                }
                Response::new(HTTP_OK, MIME_HTML, ROOT_PAGE)
            }
            "/config" => {
                self.coordinator.reset_transient_fields();
                let outcome = self
                    .portal
                    .handle_config(request, self.coordinator.fields_mut());
                if let Some(event) = outcome.event {
                    self.dispatch(event);
                }
                outcome.response
            }
            _ => self.portal.handle_not_found(request),
        }
    }

    fn dispatch(&mut self, event: PortalEvent) {
        debug!("Dispatching {:?}", event);
        match event {
            PortalEvent::ConfigSaved => {
                self.coordinator.apply_all_fields_to_clock();
            }
            PortalEvent::WifiConnected => self.synchronizer.on_wifi_connected(),
        }
    }
}
