use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::analysis::{AnalystView, ExternalAnalyst, MarketContext};
use crate::config::Config;
use crate::exchange::CollaboratorError;
use crate::models::SignalStrength;

const SYSTEM_PROMPT: &str = "You are a professional trading analyst. Provide precise, actionable trading signals based on technical analysis.";
const MAX_TOKENS: u32 = 500;
const TEMPERATURE: f64 = 0.3;
const REASONING_PREVIEW: usize = 200;

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

#[derive(Debug, Deserialize)]
struct ChatMessage {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Verdict {
    signal: String,
    #[serde(default = "default_confidence")]
    confidence: f64,
    #[serde(default)]
    reasoning: String,
}

fn default_confidence() -> f64 {
    0.5
}

/// Qualitative analyst backed by an OpenAI-compatible chat-completions API.
pub struct LlmAnalyst {
    client: Client,
    api_key: String,
    base_url: String,
    model: String,
}

impl LlmAnalyst {
    pub fn new(api_key: &str, base_url: &str, model: &str, timeout: Duration) -> Self {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .unwrap_or_else(|_| Client::new());
        Self {
            client,
            api_key: api_key.to_string(),
            base_url: base_url.trim_end_matches('/').to_string(),
            model: model.to_string(),
        }
    }

    pub fn from_config(cfg: &Config) -> Self {
        Self::new(
            &cfg.analyst_api_key,
            &cfg.analyst_base_url,
            &cfg.analyst_model,
            cfg.collaborator_timeout(),
        )
    }

    pub fn is_configured(&self) -> bool {
        !self.api_key.is_empty()
    }

    fn prompt(symbol: &str, ctx: &MarketContext) -> String {
        let levels = |v: &[f64]| -> String {
            if v.is_empty() {
                "none".to_string()
            } else {
                v.iter()
                    .map(|x| format!("{:.2}", x))
                    .collect::<Vec<_>>()
                    .join(", ")
            }
        };

        format!(
            "Analyze this market data for {symbol} and provide a trading signal.\n\n\
             Current Market Data:\n\
             - Symbol: {symbol} ({tf})\n\
             - Current Price: {price:.5}\n\
             - Price Change: {change:.2}%\n\
             - Volume Change: {volume:.2}%\n\
             - RSI: {rsi:.1}\n\
             - MACD: {macd:.4}\n\
             - Bollinger Position: {bb:.2}\n\
             - Recent High: {high:.5}\n\
             - Recent Low: {low:.5}\n\
             - Volatility: {vol:.5}\n\
             - Trend: {trend} (short-term {short})\n\
             - Support: {support}\n\
             - Resistance: {resistance}\n\n\
             Respond with JSON only, in this exact format:\n\
             {{\"signal\": \"STRONG_BUY|BUY|HOLD|SELL|STRONG_SELL\", \"confidence\": 0.75, \"reasoning\": \"...\"}}",
            symbol = symbol,
            tf = ctx.timeframe,
            price = ctx.current_price,
            change = ctx.price_change_pct,
            volume = ctx.volume_change_pct,
            rsi = ctx.rsi,
            macd = ctx.macd,
            bb = ctx.bb_position,
            high = ctx.recent_high,
            low = ctx.recent_low,
            vol = ctx.volatility,
            trend = ctx.trend,
            short = if ctx.short_term_up { "up" } else { "down" },
            support = levels(&ctx.support),
            resistance = levels(&ctx.resistance),
        )
    }

    async fn complete(&self, prompt: String) -> Result<String, CollaboratorError> {
        let body = json!({
            "model": self.model,
            "messages": [
                {"role": "system", "content": SYSTEM_PROMPT},
                {"role": "user", "content": prompt},
            ],
            "max_tokens": MAX_TOKENS,
            "temperature": TEMPERATURE,
        });

        let resp = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(CollaboratorError::Unavailable(format!(
                "analyst API error {}: {}",
                status, body
            )));
        }

        let data: ChatResponse = resp.json().await?;
        data.choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .filter(|c| !c.trim().is_empty())
            .ok_or_else(|| CollaboratorError::InvalidResponse("empty completion".to_string()))
    }
}

/// Parses a JSON verdict, tolerating code fences and surrounding prose.
/// Falls back to keyword matching on the raw text.
pub fn parse_response(text: &str) -> AnalystView {
    if let Some(view) = parse_json_verdict(text) {
        return view;
    }
    debug!("Analyst response was not JSON, falling back to keyword parsing");
    parse_text_response(text)
}

fn parse_json_verdict(text: &str) -> Option<AnalystView> {
    let start = text.find('{')?;
    let end = text.rfind('}')?;
    if end <= start {
        return None;
    }
    let verdict: Verdict = serde_json::from_str(&text[start..=end]).ok()?;
    let strength = SignalStrength::parse_loose(&verdict.signal)?;
    let confidence = if verdict.confidence.is_finite() {
        verdict.confidence.clamp(0.0, 1.0)
    } else {
        default_confidence()
    };
    Some(AnalystView {
        strength,
        confidence,
        reasoning: verdict.reasoning,
        source: "llm".to_string(),
    })
}

pub fn parse_text_response(text: &str) -> AnalystView {
    let lower = text.to_lowercase();
    let (strength, confidence) = if lower.contains("strong buy") || lower.contains("buy strong") {
        (SignalStrength::StrongBuy, 0.85)
    } else if lower.contains("buy") {
        (SignalStrength::Buy, 0.75)
    } else if lower.contains("strong sell") || lower.contains("sell strong") {
        (SignalStrength::StrongSell, 0.85)
    } else if lower.contains("sell") {
        (SignalStrength::Sell, 0.75)
    } else {
        (SignalStrength::Neutral, 0.60)
    };

    let reasoning = if text.chars().count() > REASONING_PREVIEW {
        format!("{}...", text.chars().take(REASONING_PREVIEW).collect::<String>())
    } else {
        text.to_string()
    };

    AnalystView {
        strength,
        confidence,
        reasoning,
        source: "llm_text".to_string(),
    }
}

#[async_trait]
impl ExternalAnalyst for LlmAnalyst {
    async fn analyze(
        &self,
        symbol: &str,
        context: &MarketContext,
    ) -> Result<AnalystView, CollaboratorError> {
        if !self.is_configured() {
            return Err(CollaboratorError::Unavailable(
                "no analyst API key configured".to_string(),
            ));
        }

        let text = self.complete(Self::prompt(symbol, context)).await.map_err(|e| {
            warn!("Analyst request for {} failed: {}", symbol, e);
            e
        })?;
        let view = parse_response(&text);
        info!(
            "Analyst signal for {}: {} ({:.1}%)",
            symbol,
            view.strength,
            view.confidence * 100.0
        );
        Ok(view)
    }
}
