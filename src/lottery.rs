use std::time::Duration;

use reqwest::blocking::Client;
use reqwest::header::{HeaderMap, HeaderValue, USER_AGENT};
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::domain::{DrawNo, DrawRecord, is_valid_ball, parse_int};
use crate::error::LottoError;

pub const DRAW_NO_PLACEHOLDER: &str = "{drw_no}";
pub const DEFAULT_URL_TEMPLATE: &str =
    "https://www.dhlottery.co.kr/common.do?method=getLottoNumber&drwNo={drw_no}";
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

const SUCCESS: &str = "success";
const BALL_FIELDS: [&str; 6] = [
    "drwtNo1", "drwtNo2", "drwtNo3", "drwtNo4", "drwtNo5", "drwtNo6",
];
const REQUIRED_FIELDS: [&str; 9] = [
    "drwNo", "drwNoDate", "drwtNo1", "drwtNo2", "drwtNo3", "drwtNo4", "drwtNo5", "drwtNo6",
    "bnusNo",
];

pub trait DrawClient {
    /// One request for one round. No retries.
    fn try_fetch(&self, round: DrawNo) -> Result<DrawRecord, LottoError>;

    /// Like [`DrawClient::try_fetch`], but every failure becomes `None` after
    /// being logged. An unpublished round is the normal answer before the draw
    /// is announced and is logged at info level.
    fn fetch_draw(&self, round: DrawNo) -> Option<DrawRecord> {
        match self.try_fetch(round) {
            Ok(record) => Some(record),
            Err(err) if err.is_not_published() => {
                info!("{err}");
                None
            }
            Err(err) => {
                warn!("round {round} unavailable: {err}");
                None
            }
        }
    }
}

#[derive(Debug, Clone)]
pub struct ClientOptions {
    pub url_template: String,
    pub user_agent: String,
    pub timeout: Duration,
}

impl Default for ClientOptions {
    fn default() -> Self {
        Self {
            url_template: DEFAULT_URL_TEMPLATE.to_string(),
            user_agent: default_user_agent(),
            timeout: DEFAULT_TIMEOUT,
        }
    }
}

pub fn default_user_agent() -> String {
    format!("lotto-sync/{}", env!("CARGO_PKG_VERSION"))
}

#[derive(Clone)]
pub struct LotteryHttpClient {
    client: Client,
    url_template: String,
}

impl LotteryHttpClient {
    pub fn new(options: &ClientOptions) -> Result<Self, LottoError> {
        if !options.url_template.contains(DRAW_NO_PLACEHOLDER) {
            return Err(LottoError::InvalidUrlTemplate(options.url_template.clone()));
        }
        let mut headers = HeaderMap::new();
        headers.insert(
            USER_AGENT,
            HeaderValue::from_str(&options.user_agent)
                .map_err(|err| LottoError::Http(format!("invalid user agent: {err}")))?,
        );
        let client = Client::builder()
            .default_headers(headers)
            .timeout(options.timeout)
            .build()
            .map_err(|err| LottoError::Http(err.to_string()))?;
        Ok(Self {
            client,
            url_template: options.url_template.clone(),
        })
    }

    pub fn draw_url(&self, round: DrawNo) -> String {
        draw_url(&self.url_template, round)
    }
}

impl DrawClient for LotteryHttpClient {
    fn try_fetch(&self, round: DrawNo) -> Result<DrawRecord, LottoError> {
        let url = self.draw_url(round);
        debug!("GET {url}");

        let response = self.client.get(&url).send().map_err(|err| {
            if err.is_timeout() {
                LottoError::Http(format!("timed out fetching round {round}: {err}"))
            } else {
                LottoError::Http(err.to_string())
            }
        })?;
        let status = response.status().as_u16();
        if status != 200 {
            return Err(LottoError::HttpStatus { status });
        }
        let body = response
            .text()
            .map_err(|err| LottoError::Http(err.to_string()))?;
        parse_draw_response(round, status, &body)
    }
}

pub fn draw_url(template: &str, round: DrawNo) -> String {
    template.replace(DRAW_NO_PLACEHOLDER, &round.to_string())
}

/// Validates a raw HTTP answer for `round` and maps it to a record.
pub fn parse_draw_response(
    round: DrawNo,
    status: u16,
    body: &str,
) -> Result<DrawRecord, LottoError> {
    if status != 200 {
        return Err(LottoError::HttpStatus { status });
    }
    let value: Value = serde_json::from_str(body)
        .map_err(|err| LottoError::MalformedResponse(format!("invalid JSON: {err}")))?;
    parse_draw_value(round, &value)
}

pub fn parse_draw_value(round: DrawNo, value: &Value) -> Result<DrawRecord, LottoError> {
    if !value.is_object() {
        return Err(LottoError::MalformedResponse(
            "expected a JSON object".to_string(),
        ));
    }

    match value.get("returnValue") {
        Some(Value::String(status)) if status == SUCCESS => {}
        other => {
            let return_value = match other {
                Some(Value::String(status)) => status.clone(),
                Some(other) => other.to_string(),
                None => "<missing>".to_string(),
            };
            return Err(LottoError::NotPublished {
                draw_no: round.get(),
                return_value,
            });
        }
    }

    for field in REQUIRED_FIELDS {
        if value.get(field).is_none_or(Value::is_null) {
            return Err(LottoError::MissingField(field));
        }
    }

    let draw_no = int_field(value, "drwNo")?;
    if draw_no != i64::from(round.get()) {
        return Err(LottoError::MalformedResponse(format!(
            "asked for round {round}, got drwNo {draw_no}"
        )));
    }

    let date = value
        .get("drwNoDate")
        .and_then(Value::as_str)
        .map(str::trim)
        .ok_or_else(|| LottoError::MalformedResponse("drwNoDate is not a string".to_string()))?;
    let year = date
        .get(..4)
        .and_then(|prefix| prefix.parse::<i32>().ok())
        .ok_or_else(|| LottoError::MalformedResponse(format!("unusable drwNoDate {date:?}")))?;

    let mut balls = [0u8; 6];
    for (slot, field) in balls.iter_mut().zip(BALL_FIELDS) {
        *slot = ball_field(value, field)?;
    }
    let [n1, n2, n3, n4, n5, n6] = balls;

    Ok(DrawRecord {
        year,
        draw_no: round.get(),
        date: date.to_string(),
        n1,
        n2,
        n3,
        n4,
        n5,
        n6,
        bonus: ball_field(value, "bnusNo")?,
    })
}

fn int_field(value: &Value, field: &'static str) -> Result<i64, LottoError> {
    value
        .get(field)
        .and_then(coerce_int)
        .ok_or_else(|| LottoError::MalformedResponse(format!("{field} is not an integer")))
}

fn ball_field(value: &Value, field: &'static str) -> Result<u8, LottoError> {
    let number = int_field(value, field)?;
    if !is_valid_ball(number) {
        return Err(LottoError::MalformedResponse(format!(
            "{field} out of range: {number}"
        )));
    }
    u8::try_from(number)
        .map_err(|_| LottoError::MalformedResponse(format!("{field} out of range: {number}")))
}

/// Accepts JSON integers, integral floats and numeric strings.
fn coerce_int(value: &Value) -> Option<i64> {
    match value {
        Value::Number(number) => number.as_i64().or_else(|| parse_int(&number.to_string())),
        Value::String(text) => parse_int(text),
        _ => None,
    }
}
