use std::collections::BTreeMap;
use std::io::{self, BufRead, Read, Write};
use std::net::{TcpListener, TcpStream};
use std::sync::Arc;
use std::time::Duration;

use credit_scoring_client::{
    build_scoring_provider, ScoringConfig, ScoringError, ScoringProvider, ScoringProviderConfig,
};
use credit_scoring_core::{
    descriptors_in, Domain, FeatureForm, FieldDescriptor, FieldKind, FormError, Section,
    AGE_DOMAIN, AGE_INPUT, DESCRIPTORS, EMPLOYMENT_DOMAIN, EMPLOYMENT_INPUT,
};
use serde_json::{json, Value};

use crate::session::{Session, SubmitError};
use crate::view::Outcome;

const MAX_BODY_BYTES: usize = 64 * 1024;
const DEFAULT_READ_TIMEOUT: Duration = Duration::from_secs(10);

/// Year sliders that stand in for the derived day-count features.
const YEAR_INPUTS: [YearInput; 2] = [
    YearInput {
        name: AGE_INPUT,
        label: "Âge (années)",
        section: Section::Personal,
        domain: AGE_DOMAIN,
    },
    YearInput {
        name: EMPLOYMENT_INPUT,
        label: "Années d'emploi",
        section: Section::Professional,
        domain: EMPLOYMENT_DOMAIN,
    },
];

struct YearInput {
    name: &'static str,
    label: &'static str,
    section: Section,
    domain: Domain,
}

/// Serves the scoring form and forwards submissions to the scoring service.
///
/// Connections are handled one at a time, so at most one scoring request is
/// in flight.
pub struct FormServer {
    provider: Arc<dyn ScoringProvider>,
    runtime: tokio::runtime::Runtime,
    read_timeout: Duration,
}

impl FormServer {
    pub fn new(provider: Arc<dyn ScoringProvider>) -> io::Result<Self> {
        let runtime = tokio::runtime::Runtime::new()?;
        Ok(Self {
            provider,
            runtime,
            read_timeout: DEFAULT_READ_TIMEOUT,
        })
    }

    /// Bounds how long an idle client may hold the single connection slot.
    #[must_use]
    pub fn with_read_timeout(mut self, timeout: Duration) -> Self {
        self.read_timeout = timeout;
        self
    }

    pub fn from_config(config: ScoringConfig) -> Result<Self, ScoringError> {
        let provider = build_scoring_provider(ScoringProviderConfig::Http(config))?;
        Self::new(provider).map_err(|e| ScoringError::Config(format!("runtime: {e}")))
    }

    pub fn serve_http(&self, addr: &str) -> io::Result<()> {
        let listener = TcpListener::bind(addr)?;
        self.serve_listener(&listener)
    }

    pub fn serve_listener(&self, listener: &TcpListener) -> io::Result<()> {
        tracing::info!(addr = %listener.local_addr()?, "credit scoring form listening");
        for stream in listener.incoming() {
            match stream {
                Ok(stream) => {
                    if let Err(err) = self.handle_http_connection(stream) {
                        tracing::warn!(%err, "http request error");
                    }
                }
                Err(err) => {
                    tracing::warn!(%err, "http accept error");
                }
            }
        }
        Ok(())
    }

    fn handle_http_connection(&self, mut stream: TcpStream) -> io::Result<()> {
        stream.set_read_timeout(Some(self.read_timeout))?;
        let req = match read_http_request(&stream) {
            Ok(Some(req)) => req,
            Ok(None) => return Ok(()),
            Err(err) if err.kind() == io::ErrorKind::InvalidData => {
                let response = HttpResponse::json(
                    400,
                    &json!({"error": "bad_request", "message": err.to_string()}),
                );
                write_http_response(&mut stream, &response)?;
                return Err(err);
            }
            Err(err) => return Err(err),
        };
        let response = self.dispatch_http_request(&req);
        tracing::debug!(
            method = %req.method,
            path = %req.path,
            status = response.status,
            "handled request"
        );
        write_http_response(&mut stream, &response)
    }

    fn dispatch_http_request(&self, req: &HttpRequest) -> HttpResponse {
        match (req.method.as_str(), req.path.as_str()) {
            ("GET", "/health") => HttpResponse::json(200, &json!({"status": "ok"})),
            ("GET", "/") => HttpResponse::html(200, render_page(&FeatureForm::new(), None)),
            ("POST", "/") => self.handle_form_submit(&req.body),
            ("POST", "/api/score") => self.handle_json_submit(&req.body),
            (_, "/" | "/health" | "/api/score") => HttpResponse::json(
                405,
                &json!({"error": "method_not_allowed", "message": req.method}),
            ),
            _ => HttpResponse::json(404, &json!({"error": "not_found", "path": req.path})),
        }
    }

    fn handle_form_submit(&self, body: &[u8]) -> HttpResponse {
        let mut session = Session::new();
        let outcome = match apply_form_fields(session.form_mut(), body) {
            Ok(()) => self.submit(&session),
            Err(err) => Outcome::failed(&SubmitError::Form(err)),
        };
        HttpResponse::html(200, render_page(session.form(), Some(&outcome)))
    }

    fn handle_json_submit(&self, body: &[u8]) -> HttpResponse {
        let mut session = Session::new();
        let outcome = match apply_json_fields(session.form_mut(), body) {
            Ok(()) => self.submit(&session),
            Err(err) => Outcome::failed(&SubmitError::Form(err)),
        };
        let payload = serde_json::to_value(&outcome).unwrap_or_else(|_| json!({}));
        HttpResponse::json(outcome.http_status(), &payload)
    }

    fn submit(&self, session: &Session) -> Outcome {
        let result = self
            .runtime
            .block_on(session.submit(self.provider.as_ref()));
        if let Err(err) = &result {
            tracing::warn!(category = err.category(), %err, "scoring submission failed");
        }
        Outcome::from_submission(&result)
    }
}

/// Applies an `application/x-www-form-urlencoded` submission.
///
/// Checkboxes are only sent when ticked, so a missing checkbox flag reads as 0.
fn apply_form_fields(form: &mut FeatureForm, body: &[u8]) -> Result<(), FormError> {
    let edits: BTreeMap<String, Result<f64, FormError>> = url::form_urlencoded::parse(body)
        .map(|(name, raw)| {
            let value = parse_number(&name, &raw);
            (name.into_owned(), value)
        })
        .collect();

    for descriptor in &DESCRIPTORS {
        let is_checkbox = descriptor.kind == FieldKind::Flag && descriptor.choices.is_none();
        if is_checkbox && !edits.contains_key(descriptor.key.as_str()) {
            form.set_value(descriptor.key, 0.0)?;
        }
    }
    apply_edits(form, edits)
}

/// Applies a JSON object of `{name: number}` edits; absent fields keep defaults.
fn apply_json_fields(form: &mut FeatureForm, body: &[u8]) -> Result<(), FormError> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(());
    }
    let parsed: Value = serde_json::from_slice(body).map_err(|e| FormError::Validation {
        key: "body".to_string(),
        reason: format!("invalid JSON: {e}"),
    })?;
    let Some(object) = parsed.as_object() else {
        return Err(FormError::Validation {
            key: "body".to_string(),
            reason: "expected a JSON object".to_string(),
        });
    };
    let edits = object
        .iter()
        .map(|(name, value)| {
            let number = value.as_f64().ok_or_else(|| FormError::Validation {
                key: name.clone(),
                reason: "value must be a number".to_string(),
            });
            (name.clone(), number)
        })
        .collect();
    apply_edits(form, edits)
}

/// Applies edits in wire order, then the year inputs, then unknown names.
///
/// Every valid edit lands even when others are rejected; rejections are
/// reported together and leave the previous value in place.
fn apply_edits(
    form: &mut FeatureForm,
    mut edits: BTreeMap<String, Result<f64, FormError>>,
) -> Result<(), FormError> {
    let mut errors = Vec::new();
    let order = DESCRIPTORS
        .iter()
        .map(|d| d.key.as_str())
        .chain([AGE_INPUT, EMPLOYMENT_INPUT]);
    for name in order {
        if let Some(edit) = edits.remove(name) {
            if let Err(err) = edit.and_then(|value| form.set(name, value)) {
                errors.push(err);
            }
        }
    }
    errors.extend(edits.into_keys().map(FormError::UnknownKey));
    merge_errors(errors)
}

fn merge_errors(mut errors: Vec<FormError>) -> Result<(), FormError> {
    if errors.len() <= 1 {
        return errors.pop().map_or(Ok(()), Err);
    }
    let (keys, reasons): (Vec<String>, Vec<String>) = errors
        .iter()
        .map(|err| match err {
            FormError::Validation { key, reason } => (key.clone(), reason.clone()),
            FormError::UnknownKey(key) => (key.clone(), "unknown field".to_string()),
            FormError::IncompleteVector(key) => ((*key).to_string(), err.to_string()),
        })
        .unzip();
    Err(FormError::Validation {
        key: keys.join(", "),
        reason: reasons.join("; "),
    })
}

fn parse_number(name: &str, raw: &str) -> Result<f64, FormError> {
    raw.trim().parse::<f64>().map_err(|_| FormError::Validation {
        key: name.to_string(),
        reason: format!("{raw:?} is not a number"),
    })
}

pub fn render_page(form: &FeatureForm, outcome: Option<&Outcome>) -> String {
    let mut html = String::with_capacity(8 * 1024);
    html.push_str(concat!(
        "<!DOCTYPE html>\n<html lang=\"fr\"><head><meta charset=\"utf-8\">",
        "<title>Outil de Scoring Crédit</title></head><body>\n",
        "<h1>📊 Outil d'Évaluation de Risque de Crédit</h1>\n",
        "<p>Cet outil utilise un modèle XGBoost pour prédire le risque de défaut de paiement.</p>\n",
        "<form method=\"post\" action=\"/\" onsubmit=\"var b=this.querySelector('button');",
        "b.disabled=true;b.textContent='Calcul du score de risque en cours...';\">\n",
    ));

    for section in Section::ALL {
        html.push_str(&format!("<fieldset><legend>{}</legend>\n", escape_html(section.title())));
        for descriptor in descriptors_in(section) {
            let value = form.value(descriptor.key).unwrap_or(descriptor.default);
            render_field(&mut html, descriptor, value);
        }
        for input in YEAR_INPUTS.iter().filter(|i| i.section == section) {
            let years = if input.name == AGE_INPUT {
                form.age_years()
            } else {
                form.employment_years()
            };
            let (min, max) = domain_bounds(&input.domain).unwrap_or((0.0, 100.0));
            html.push_str(&format!(
                "<label>{} <input type=\"range\" name=\"{}\" min=\"{min}\" max=\"{max}\" step=\"1\" value=\"{years}\"></label><br>\n",
                escape_html(input.label),
                input.name,
            ));
        }
        html.push_str("</fieldset>\n");
    }

    html.push_str("<button type=\"submit\">Évaluer le risque de crédit</button>\n</form>\n");
    if let Some(outcome) = outcome {
        render_outcome(&mut html, outcome);
    }
    html.push_str(
        "<hr><small>Modèle XGBoost entraîné sur 20 features</small>\n</body></html>\n",
    );
    html
}

fn render_field(html: &mut String, descriptor: &FieldDescriptor, value: f64) {
    let name = descriptor.key.as_str();
    let label = escape_html(descriptor.label);
    let (min, max) = domain_bounds(&descriptor.domain).unwrap_or((f64::MIN, f64::MAX));
    let line = match descriptor.kind {
        FieldKind::Derived => return,
        FieldKind::Amount => format!(
            "<label>{label} <input type=\"number\" name=\"{name}\" step=\"0.01\" value=\"{value}\"></label>"
        ),
        FieldKind::Score | FieldKind::Rating => {
            let step = if descriptor.kind == FieldKind::Score { "0.01" } else { "1" };
            format!(
                "<label>{label} <input type=\"range\" name=\"{name}\" min=\"{min}\" max=\"{max}\" step=\"{step}\" value=\"{value}\"></label>"
            )
        }
        FieldKind::Count => format!(
            "<label>{label} <input type=\"number\" name=\"{name}\" min=\"{min}\" max=\"{max}\" step=\"1\" value=\"{value}\"></label>"
        ),
        FieldKind::Flag => match descriptor.choices {
            Some([off, on]) => {
                let (off_sel, on_sel) = if value > 0.5 { ("", " selected") } else { (" selected", "") };
                format!(
                    "<label>{label} <select name=\"{name}\"><option value=\"0\"{off_sel}>{}</option><option value=\"1\"{on_sel}>{}</option></select></label>",
                    escape_html(off),
                    escape_html(on),
                )
            }
            None => {
                let checked = if value > 0.5 { " checked" } else { "" };
                format!(
                    "<label><input type=\"checkbox\" name=\"{name}\" value=\"1\"{checked}> {label}</label>"
                )
            }
        },
    };
    html.push_str(&line);
    html.push_str("<br>\n");
}

fn render_outcome(html: &mut String, outcome: &Outcome) {
    html.push_str("<hr><section id=\"outcome\">\n");
    match outcome {
        Outcome::Scored {
            probability,
            probability_label,
            high_risk,
            headline,
            detail,
            factors,
            ..
        } => {
            let class = if *high_risk { "high-risk" } else { "low-risk" };
            html.push_str(&format!(
                "<p>Probabilité de défaut: <strong>{}</strong></p>\n<progress value=\"{probability}\" max=\"1\"></progress>\n",
                escape_html(probability_label)
            ));
            html.push_str(&format!(
                "<div class=\"{class}\"><strong>{}</strong><p>{}</p></div>\n",
                escape_html(headline),
                escape_html(detail)
            ));
            html.push_str("<h2>Facteurs influençant la décision</h2>\n<ol>\n");
            for factor in factors {
                html.push_str(&format!("<li>{}</li>\n", escape_html(factor)));
            }
            html.push_str("</ol>\n");
        }
        Outcome::Failed { category, message } => {
            html.push_str(&format!(
                "<div class=\"error\" data-category=\"{category}\">{}</div>\n",
                escape_html(message)
            ));
        }
    }
    html.push_str("</section>\n");
}

fn domain_bounds(domain: &Domain) -> Option<(f64, f64)> {
    match *domain {
        Domain::Any => None,
        Domain::Range { min, max } => Some((min, max)),
        #[allow(clippy::cast_precision_loss)]
        Domain::Integer { min, max } => Some((min as f64, max as f64)),
        Domain::Discrete(values) => {
            let min = values.iter().copied().reduce(f64::min)?;
            let max = values.iter().copied().reduce(f64::max)?;
            Some((min, max))
        }
    }
}

fn escape_html(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    for ch in raw.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(ch),
        }
    }
    out
}

#[derive(Debug)]
struct HttpRequest {
    method: String,
    path: String,
    body: Vec<u8>,
}

struct HttpResponse {
    status: u16,
    content_type: &'static str,
    body: Vec<u8>,
}

impl HttpResponse {
    fn json(status: u16, value: &Value) -> Self {
        let body = serde_json::to_vec(value).unwrap_or_else(|_| b"{}".to_vec());
        Self {
            status,
            content_type: "application/json",
            body,
        }
    }

    fn html(status: u16, body: String) -> Self {
        Self {
            status,
            content_type: "text/html; charset=utf-8",
            body: body.into_bytes(),
        }
    }
}

fn read_http_request(stream: &TcpStream) -> io::Result<Option<HttpRequest>> {
    let mut reader = io::BufReader::new(stream.try_clone()?);
    let mut line = String::new();
    if reader.read_line(&mut line)? == 0 {
        return Ok(None);
    }
    let first = line.trim_end_matches(['\r', '\n']);
    if first.is_empty() {
        return Ok(None);
    }

    let mut parts = first.split_whitespace();
    let Some(method) = parts.next() else {
        return Err(io::Error::new(
            io::ErrorKind::InvalidData,
            "invalid http request line (missing method)",
        ));
    };
    let Some(target) = parts.next() else {
        return Err(io::Error::new(
            io::ErrorKind::InvalidData,
            "invalid http request line (missing path)",
        ));
    };
    let path = target.split_once('?').map_or(target, |(p, _)| p);

    let mut content_length = 0usize;
    loop {
        let mut header = String::new();
        if reader.read_line(&mut header)? == 0 {
            break;
        }
        let header = header.trim_end_matches(['\r', '\n']);
        if header.is_empty() {
            break;
        }
        if let Some((name, value)) = header.split_once(':') {
            if name.trim().eq_ignore_ascii_case("content-length") {
                content_length = value.trim().parse::<usize>().map_err(|_| {
                    io::Error::new(
                        io::ErrorKind::InvalidData,
                        format!("invalid content-length: {}", value.trim()),
                    )
                })?;
            }
        }
    }
    if content_length > MAX_BODY_BYTES {
        return Err(io::Error::new(
            io::ErrorKind::InvalidData,
            format!("request body too large: {content_length} bytes"),
        ));
    }

    let mut body = vec![0_u8; content_length];
    if content_length > 0 {
        reader.read_exact(&mut body)?;
    }
    Ok(Some(HttpRequest {
        method: method.to_string(),
        path: path.to_string(),
        body,
    }))
}

fn write_http_response(stream: &mut TcpStream, response: &HttpResponse) -> io::Result<()> {
    let headers = format!(
        "HTTP/1.1 {} {}\r\nContent-Type: {}\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
        response.status,
        http_reason_phrase(response.status),
        response.content_type,
        response.body.len()
    );
    stream.write_all(headers.as_bytes())?;
    stream.write_all(&response.body)?;
    stream.flush()
}

const fn http_reason_phrase(status: u16) -> &'static str {
    match status {
        200 => "OK",
        400 => "Bad Request",
        404 => "Not Found",
        405 => "Method Not Allowed",
        409 => "Conflict",
        422 => "Unprocessable Entity",
        502 => "Bad Gateway",
        _ => "Internal Server Error",
    }
}
