/*!
 # Configuration portal adapter

 The captive portal (web server, DNS redirection, WiFi association and
 persistence) is an external collaborator. [`Portal`] is the contract the
 controller relies on: the adapter fills field buffers from submissions and
 reports what happened as [`PortalEvent`]s, which the controller dispatches
 inside its own loop.

 [`MemoryPortal`] is an in-process adapter with simulated flash storage.
*/

use crate::field::{FieldSpec, FieldStore, Persistence, MAX_VALUE_LEN};
use crate::pins::InputPin;
use crate::{Error, Result};
use std::collections::HashMap;
use tracing::{debug, info, instrument, warn};

/// Name of this IoT thing, also the access point SSID
pub const THING_NAME: &str = "WordClockLT";

/// Access point password used until one is configured
pub const INITIAL_AP_PASSWORD: &str = "12345678";

/// Change whenever the stored configuration layout changes
pub const CONFIG_VERSION: &str = "v1";

pub const WEB_SERVER_PORT: u16 = 80;

/// Address of the device in access point mode
pub const AP_ADDRESS: &str = "192.168.4.1";

pub const HTTP_OK: u16 = 200;
pub const HTTP_FOUND: u16 = 302;
pub const HTTP_BAD_REQUEST: u16 = 400;
pub const HTTP_NOT_FOUND: u16 = 404;
pub const HTTP_SERVICE_UNAVAILABLE: u16 = 503;

pub const MIME_HTML: &str = "text/html";
pub const MIME_TEXT: &str = "text/plain";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Post,
}

/// Incoming HTTP request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Request {
    pub method: Method,
    pub path: String,
    /// Value of the `Host` header
    pub host: Option<String>,
    pub body: String,
}

impl Request {
    pub fn get(path: &str) -> Self {
        Self {
            method: Method::Get,
            path: path.to_string(),
            host: None,
            body: String::new(),
        }
    }

    pub fn post(path: &str, body: &str) -> Self {
        Self {
            method: Method::Post,
            path: path.to_string(),
            host: None,
            body: body.to_string(),
        }
    }

    pub fn with_host(mut self, host: &str) -> Self {
        self.host = Some(host.to_string());
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    pub status: u16,
    pub content_type: &'static str,
    pub headers: Vec<(&'static str, String)>,
    pub body: String,
}

impl Response {
    pub fn new(status: u16, content_type: &'static str, body: impl Into<String>) -> Self {
        Self {
            status,
            content_type,
            headers: Vec::new(),
            body: body.into(),
        }
    }

    pub fn redirect(location: &str) -> Self {
        let mut response = Self::new(HTTP_FOUND, MIME_TEXT, "");
        response.headers.push(("Location", location.to_string()));
        response
    }
}

/// Notifications the adapter hands back to the controller
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PortalEvent {
    /// A config form submission was stored
    ConfigSaved,
    /// The station connection to the configured WiFi came up
    WifiConnected,
}

/// Result of handling the config page
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigOutcome {
    pub response: Response,
    pub event: Option<PortalEvent>,
}

pub trait Portal {
    /// Registers a field to show on the config page
    fn add_field(&mut self, spec: &'static FieldSpec);
    /// Pin showing WiFi / access point status
    fn set_status_pin(&mut self, pin: u8);
    /// Button pin sampled at `init`
    fn set_config_pin(&mut self, pin: u8);
    /// Starts the portal and restores persisted values into `fields`
    fn init(&mut self, fields: &mut FieldStore) -> Result<()>;
    /// Redirects requests for foreign hosts to the portal. `None` lets the
    /// caller answer.
    fn handle_captive_portal(&mut self, request: &Request) -> Option<Response>;
    /// Serves and accepts the config form
    fn handle_config(&mut self, request: &Request, fields: &mut FieldStore) -> ConfigOutcome;
    fn handle_not_found(&mut self, request: &Request) -> Response;
    /// Background work, returns events raised since the last call
    fn do_loop(&mut self) -> Vec<PortalEvent>;
}

/// Decodes an `application/x-www-form-urlencoded` body
pub fn decode_form(body: &str) -> Vec<(String, String)> {
    body.split('&')
        .filter(|pair| !pair.is_empty())
        .map(|pair| {
            let (name, value) = pair.split_once('=').unwrap_or((pair, ""));
            (percent_decode(name), percent_decode(value))
        })
        .collect()
}

fn percent_decode(text: &str) -> String {
    let bytes = text.as_bytes();
    let mut decoded = Vec::with_capacity(bytes.len());
    let mut index = 0;
    while index < bytes.len() {
        match bytes[index] {
            b'+' => decoded.push(b' '),
            b'%' if index + 2 < bytes.len() => {
                let hex = std::str::from_utf8(&bytes[index + 1..index + 3]).unwrap_or("");
                match u8::from_str_radix(hex, 16) {
                    Ok(byte) => {
                        decoded.push(byte);
                        index += 2;
                    }
                    Err(_) => decoded.push(b'%'),
                }
            }
            byte => decoded.push(byte),
        }
        index += 1;
    }
    String::from_utf8_lossy(&decoded).into_owned()
}

fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '\'' => escaped.push_str("&#39;"),
            '"' => escaped.push_str("&quot;"),
            c => escaped.push(c),
        }
    }
    escaped
}

/// Portal adapter keeping its "flash" in memory
#[derive(Debug)]
pub struct MemoryPortal<B = crate::pins::FixedPin> {
    thing_name: String,
    ap_password: String,
    config_button: B,
    status_pin: Option<u8>,
    config_pin: Option<u8>,
    fields: Vec<&'static FieldSpec>,
    storage: HashMap<&'static str, String>,
    initialized: bool,
    wifi_pending: bool,
}

impl MemoryPortal {
    pub fn new(thing_name: &str) -> Self {
        Self::with_config_button(thing_name, crate::pins::FixedPin { low: false })
    }
}

impl<B: InputPin> MemoryPortal<B> {
    pub fn with_config_button(thing_name: &str, config_button: B) -> Self {
        Self {
            thing_name: thing_name.to_string(),
            ap_password: INITIAL_AP_PASSWORD.to_string(),
            config_button,
            status_pin: None,
            config_pin: None,
            fields: Vec::new(),
            storage: HashMap::new(),
            initialized: false,
            wifi_pending: false,
        }
    }

    pub fn ap_password(&self) -> &str {
        &self.ap_password
    }

    pub fn set_ap_password(&mut self, password: &str) {
        self.ap_password = password.to_string();
    }

    pub fn registered_fields(&self) -> &[&'static FieldSpec] {
        &self.fields
    }

    /// Persisted text of a field, as it would survive a reboot
    pub fn stored(&self, name: &str) -> Option<&str> {
        self.storage.get(name).map(String::as_str)
    }

    /// Simulates a power cycle: stored values and the AP password survive,
    /// registrations and pending events do not.
    pub fn reboot(&self) -> Self
    where
        B: Clone,
    {
        Self {
            thing_name: self.thing_name.clone(),
            ap_password: self.ap_password.clone(),
            config_button: self.config_button.clone(),
            status_pin: None,
            config_pin: None,
            fields: Vec::new(),
            storage: self.storage.clone(),
            initialized: false,
            wifi_pending: false,
        }
    }

    /// Simulates the station connection coming up
    pub fn connect_wifi(&mut self) {
        info!("Connected to WiFi");
        self.wifi_pending = true;
    }

    fn is_own_host(&self, host: &str) -> bool {
        let host = host.split(':').next().unwrap_or(host);
        host == AP_ADDRESS
            || host.eq_ignore_ascii_case(&self.thing_name)
            || host.eq_ignore_ascii_case(&format!("{}.local", self.thing_name))
    }

    fn render_form(&self, fields: &FieldStore) -> String {
        let mut html = format!(
            "<!DOCTYPE html><html lang='en'><head><title>{}</title></head><body>\
             <form action='config' method='post'>",
            self.thing_name
        );
        let mut group = "";
        for spec in &self.fields {
            if spec.group != group {
                group = spec.group;
                html.push_str(&format!("<h3>{group}</h3>"));
            }
            html.push_str(&format!(
                "<label for='{name}'>{label}</label>\
                 <input type='{kind}' id='{name}' name='{name}' value='{value}' \
                 placeholder='{placeholder}' {attrs}/>",
                name = spec.name,
                label = spec.label,
                kind = spec.input_type,
                value = escape_html(fields.get(spec.id)),
                placeholder = spec.placeholder,
                attrs = spec.custom_html,
            ));
        }
        html.push_str("<button type='submit'>Apply</button></form></body></html>\n");
        html
    }

    fn store_submission(&mut self, body: &str, fields: &mut FieldStore) -> Result<()> {
        let submitted = decode_form(body);

        // Validate everything before touching a buffer.
        let mut updates = Vec::new();
        for (name, value) in &submitted {
            let Some(spec) = self.fields.iter().find(|spec| spec.name == name.as_str()) else {
                debug!("Ignoring unregistered form field {}", name);
                continue;
            };
            if value.len() > MAX_VALUE_LEN {
                return Err(Error::ValueTooLong {
                    field: spec.name,
                    max: MAX_VALUE_LEN,
                });
            }
            updates.push((spec.id, value.as_str()));
        }

        for (id, value) in updates {
            fields.set(id, value)?;
            if id.spec().persistence == Persistence::Persistent {
                self.storage.insert(id.name(), value.to_string());
            }
        }
        Ok(())
    }
}

impl<B: InputPin> Portal for MemoryPortal<B> {
    fn add_field(&mut self, spec: &'static FieldSpec) {
        self.fields.push(spec);
    }

    fn set_status_pin(&mut self, pin: u8) {
        self.status_pin = Some(pin);
    }

    fn set_config_pin(&mut self, pin: u8) {
        self.config_pin = Some(pin);
    }

    #[instrument(skip_all, fields(thing = %self.thing_name))]
    fn init(&mut self, fields: &mut FieldStore) -> Result<()> {
        if self.config_pin.is_some() && self.config_button.is_low() {
            info!("Config button pressed, using initial AP password");
            self.ap_password = INITIAL_AP_PASSWORD.to_string();
        }

        for spec in &self.fields {
            if let Some(value) = self.storage.get(spec.name) {
                fields.set(spec.id, value)?;
            }
        }
        info!(
            "Portal {} ready on port {} with {} fields (config {}, status pin {:?})",
            self.thing_name,
            WEB_SERVER_PORT,
            self.fields.len(),
            CONFIG_VERSION,
            self.status_pin
        );
        self.initialized = true;
        Ok(())
    }

    fn handle_captive_portal(&mut self, request: &Request) -> Option<Response> {
        let host = request.host.as_deref()?;
        if self.is_own_host(host) {
            return None;
        }
        debug!("Captive portal redirect for host {}", host);
        Some(Response::redirect(&format!("http://{AP_ADDRESS}/")))
    }

    fn handle_config(&mut self, request: &Request, fields: &mut FieldStore) -> ConfigOutcome {
        match request.method {
            Method::Get => ConfigOutcome {
                response: Response::new(HTTP_OK, MIME_HTML, self.render_form(fields)),
                event: None,
            },
            Method::Post => match self.store_submission(&request.body, fields) {
                Ok(()) => {
                    info!("Configuration saved");
                    ConfigOutcome {
                        response: Response::new(HTTP_OK, MIME_HTML, self.render_form(fields)),
                        event: Some(PortalEvent::ConfigSaved),
                    }
                }
                Err(e) => {
                    warn!("Rejected configuration: {}", e);
                    ConfigOutcome {
                        response: Response::new(HTTP_BAD_REQUEST, MIME_TEXT, e.to_string()),
                        event: None,
                    }
                }
            },
        }
    }

    fn handle_not_found(&mut self, request: &Request) -> Response {
        if let Some(redirect) = self.handle_captive_portal(request) {
            return redirect;
        }
        Response::new(HTTP_NOT_FOUND, MIME_TEXT, format!("{} not found", request.path))
    }

    fn do_loop(&mut self) -> Vec<PortalEvent> {
        if self.initialized && std::mem::take(&mut self.wifi_pending) {
            return vec![PortalEvent::WifiConnected];
        }
        Vec::new()
    }
}
