use augur_models::market::{MarketSnapshot, NewsItem, WalletActivity};
use augur_models::profile::RiskProfile;

pub const MAX_PROMPT_TRADES: usize = 15;
pub const MAX_PROMPT_NEWS: usize = 10;
pub const SNIPPET_CHARS: usize = 200;

/// Advisor system prompt. Unknown profiles get the moderate guidance.
pub fn advisor_system_prompt(risk_profile: RiskProfile) -> String {
    let profile = match risk_profile {
        RiskProfile::Unknown => RiskProfile::Moderate,
        other => other,
    };
    format!(
        "You are AUGUR ADVISOR, an expert trading analyst specializing in Polymarket \
         prediction markets.\n\n\
         Analyze market data, smart-money activity and news context to produce \
         high-confidence trade recommendations with transparent reasoning.\n\n\
         ## ANALYTICAL FRAMEWORK\n\n\
         1. **Market Efficiency**: Is the current price (probability) accurate given the \
         available information?\n\
         2. **Smart Money Signal**: Are tracked wallets buying or selling? Follow the flow.\n\
         3. **News Catalyst**: Is there breaking news the market has not priced in yet?\n\
         4. **Risk Assessment**: What could go wrong? What is the downside?\n\n\
         ## RISK PROFILE\n\n\
         The user's risk profile is: {profile}\n\
         - \"conservative\" → Only recommend HIGH confidence (>0.8) signals with clear catalysts\n\
         - \"moderate\" → Recommend moderate-to-high confidence signals\n\
         - \"degen\" → Include speculative plays with interesting risk/reward\n\n\
         ## OUTPUT FORMAT\n\n\
         Respond with a JSON array of decisions. Each decision has:\n\
         - \"market_question\": the market question\n\
         - \"market_slug\": the market slug for linking\n\
         - \"signal\": one of \"BUY_YES\", \"BUY_NO\", \"HOLD\", \"SKIP\"\n\
         - \"confidence\": number from 0.0 to 1.0\n\
         - \"reasoning\": 2-4 sentences explaining the decision path\n\
         - \"key_factors\": 2-4 short bullet points driving the decision\n\
         - \"risk_level\": \"low\", \"medium\" or \"high\"\n\n\
         Only include markets where you have a meaningful opinion. Skip markets with \
         insufficient data.\n\
         Respond ONLY with the JSON array, no markdown formatting."
    )
}

/// The advisor's user prompt: market data, smart money and news sections.
pub fn advisor_user_prompt(
    snapshots: &[MarketSnapshot],
    trades: &[WalletActivity],
    news: &[NewsItem],
) -> String {
    let mut parts = vec!["## MARKET DATA".to_string()];
    for s in snapshots {
        let slug = if s.slug.is_empty() { "N/A" } else { &s.slug };
        parts.push(format!(
            "- {}\n  Slug: {}\n  YES: {:.1}% | NO: {:.1}%",
            s.question,
            slug,
            s.yes_price * 100.0,
            s.no_price * 100.0
        ));
    }

    if !trades.is_empty() {
        parts.push("\n## SMART MONEY ACTIVITY (Tracked Wallets)".to_string());
        for t in trades.iter().take(MAX_PROMPT_TRADES) {
            parts.push(format!(
                "- Wallet {}: {} ${} ({} shares @ {:.3}) on {}",
                mask_wallet(&t.wallet),
                t.side,
                with_thousands(t.usd_size, 2),
                with_thousands(t.shares, 0),
                t.price,
                t.market_slug
            ));
        }
    }

    if !news.is_empty() {
        parts.push("\n## NEWS & RESEARCH".to_string());
        for n in news.iter().take(MAX_PROMPT_NEWS) {
            let source = if n.source.is_empty() { "web" } else { &n.source };
            parts.push(format!(
                "- [{}] {}\n  Source: {} | {}",
                n.relevance.as_str().to_uppercase(),
                n.title,
                source,
                truncate_chars(&n.snippet, SNIPPET_CHARS)
            ));
        }
    }

    format!(
        "Analyze the following data and produce trade recommendations:\n\n{}",
        parts.join("\n")
    )
}

/// `0x1234...abcd`. Short addresses are shown as-is.
pub fn mask_wallet(wallet: &str) -> String {
    let chars: Vec<char> = wallet.chars().collect();
    if chars.len() <= 10 {
        return wallet.to_string();
    }
    let head: String = chars[..6].iter().collect();
    let tail: String = chars[chars.len() - 4..].iter().collect();
    format!("{head}...{tail}")
}

pub fn truncate_chars(text: &str, max: usize) -> &str {
    match text.char_indices().nth(max) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

fn with_thousands(value: f64, decimals: usize) -> String {
    let formatted = format!("{:.*}", decimals, value.abs());
    let (int_part, frac_part) = match formatted.split_once('.') {
        Some((i, f)) => (i, Some(f)),
        None => (formatted.as_str(), None),
    };

    let mut grouped = String::with_capacity(int_part.len() + int_part.len() / 3);
    for (i, ch) in int_part.chars().enumerate() {
        if i > 0 && (int_part.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }

    let sign = if value < 0.0 && formatted.chars().any(|c| c != '0' && c != '.') {
        "-"
    } else {
        ""
    };
    match frac_part {
        Some(frac) => format!("{sign}{grouped}.{frac}"),
        None => format!("{sign}{grouped}"),
    }
}
