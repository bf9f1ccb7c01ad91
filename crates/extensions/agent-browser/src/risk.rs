//! Risk classification for proposed tool calls.
//!
//! Classification is an ordered rule table: the first rule whose tool list
//! contains the call's tool name and whose check matches decides the tier.
//! Calls no rule claims are [`RiskTier::Moderate`] without confirmation.

use std::fmt;

use serde::Serialize;
use serde_json::Value;

/// Risk tier of an action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RiskTier {
    Safe,
    Moderate,
    Destructive,
}

impl RiskTier {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Safe => "safe",
            Self::Moderate => "moderate",
            Self::Destructive => "destructive",
        }
    }
}

impl fmt::Display for RiskTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of classifying one call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ActionClassification {
    pub risk: RiskTier,
    pub reason: String,
    pub requires_confirmation: bool,
}

/// Vocabulary that marks a click target as irreversible.
pub const DESTRUCTIVE_KEYWORDS: &[&str] = &[
    // payment / purchase
    "pay", "payment", "оплат", "купить", "buy", "purchase", "checkout", "order", "заказ",
    "подтвердить заказ", "confirm order", "place order", "оформить", "proceed to payment",
    // delete / remove
    "delete", "удалить", "remove", "убрать", "clear", "очистить", "trash", "корзина", "spam",
    "спам",
    // send / submit
    "send", "отправить", "submit", "опубликовать", "publish", "post",
    // account
    "unsubscribe", "отписаться", "cancel subscription", "отменить подписку", "logout", "выйти",
    "sign out",
];

/// Vocabulary that marks an input as sensitive.
pub const SENSITIVE_INPUT_KEYWORDS: &[&str] = &[
    "card", "карт", "cvv", "cvc", "credit", "debit", "password", "пароль", "pin", "пин", "ssn",
    "social security",
];

/// URL fragments of payment, cart and checkout pages.
pub const PAYMENT_URL_PATTERNS: &[&str] =
    &["checkout", "payment", "pay", "order", "cart", "basket", "корзина"];

/// Click targets that commit a form on a payment page.
pub const SUBMIT_KEYWORDS: &[&str] = &["submit", "confirm", "оформить", "заказ", "order"];

const READ_ONLY_TOOLS: &[&str] = &[
    "navigate_to_url",
    "get_current_url",
    "take_screenshot",
    "wait",
    "scroll",
];

const NON_MODIFYING_TOOLS: &[&str] = &["query_dom", "get_all_elements", "close_popups", "hover", "back"];

/// Minimum digit count treated as a payment card number.
const CARD_NUMBER_DIGITS: usize = 13;

/// What a rule looks at.
#[derive(Debug, Clone, Copy)]
pub enum RuleCheck {
    /// Matches unconditionally.
    Always(&'static str),
    /// The lower-cased `selector` argument contains one of the keywords.
    /// The reason is `"<prefix> '<keyword>'"`.
    SelectorKeyword {
        keywords: &'static [&'static str],
        reason_prefix: &'static str,
    },
    /// The page URL looks like a payment page and the selector contains one
    /// of the keywords.
    PaymentPageSelector {
        keywords: &'static [&'static str],
        reason: &'static str,
    },
    /// The `text` argument carries at least 13 digits.
    CardNumber(&'static str),
    /// The `keys` argument presses Enter on a payment page.
    EnterOnPaymentPage(&'static str),
}

/// One row of the rule table.
#[derive(Debug, Clone, Copy)]
pub struct RiskRule {
    pub tools: &'static [&'static str],
    pub check: RuleCheck,
    pub risk: RiskTier,
    pub requires_confirmation: bool,
}

impl RiskRule {
    const fn new(
        tools: &'static [&'static str],
        check: RuleCheck,
        risk: RiskTier,
        requires_confirmation: bool,
    ) -> Self {
        Self {
            tools,
            check,
            risk,
            requires_confirmation,
        }
    }

    /// The reason this rule gives for the call, or `None` when it does not apply.
    fn evaluate(&self, tool_name: &str, args: &Value, page_url: &str) -> Option<String> {
        if !self.tools.contains(&tool_name) {
            return None;
        }
        match self.check {
            RuleCheck::Always(reason) => Some(reason.to_string()),
            RuleCheck::SelectorKeyword {
                keywords,
                reason_prefix,
            } => {
                let selector = arg_str(args, "selector").to_lowercase();
                keywords
                    .iter()
                    .find(|k| selector.contains(*k))
                    .map(|k| format!("{} '{}'", reason_prefix, k))
            }
            RuleCheck::PaymentPageSelector { keywords, reason } => {
                let selector = arg_str(args, "selector").to_lowercase();
                (is_payment_page(page_url) && keywords.iter().any(|k| selector.contains(k)))
                    .then(|| reason.to_string())
            }
            RuleCheck::CardNumber(reason) => {
                let digits = arg_str(args, "text")
                    .chars()
                    .filter(|c| c.is_ascii_digit())
                    .count();
                (digits >= CARD_NUMBER_DIGITS).then(|| reason.to_string())
            }
            RuleCheck::EnterOnPaymentPage(reason) => {
                let keys = arg_str(args, "keys").to_lowercase();
                (keys.contains("enter") && is_payment_page(page_url)).then(|| reason.to_string())
            }
        }
    }
}

/// The built-in rule table, in evaluation order.
pub const DEFAULT_RULES: &[RiskRule] = &[
    RiskRule::new(
        READ_ONLY_TOOLS,
        RuleCheck::Always("Read-only or navigation action"),
        RiskTier::Safe,
        false,
    ),
    RiskRule::new(
        NON_MODIFYING_TOOLS,
        RuleCheck::Always("Non-modifying action"),
        RiskTier::Safe,
        false,
    ),
    RiskRule::new(
        &["click"],
        RuleCheck::SelectorKeyword {
            keywords: DESTRUCTIVE_KEYWORDS,
            reason_prefix: "Click on element containing",
        },
        RiskTier::Destructive,
        true,
    ),
    RiskRule::new(
        &["click"],
        RuleCheck::PaymentPageSelector {
            keywords: SUBMIT_KEYWORDS,
            reason: "Submit/confirm action on payment-related page",
        },
        RiskTier::Destructive,
        true,
    ),
    RiskRule::new(
        &["click"],
        RuleCheck::Always("Regular click action"),
        RiskTier::Safe,
        false,
    ),
    RiskRule::new(
        &["type_text"],
        RuleCheck::SelectorKeyword {
            keywords: SENSITIVE_INPUT_KEYWORDS,
            reason_prefix: "Typing into sensitive field containing",
        },
        RiskTier::Destructive,
        true,
    ),
    RiskRule::new(
        &["type_text"],
        RuleCheck::CardNumber("Text appears to be payment card number"),
        RiskTier::Destructive,
        true,
    ),
    RiskRule::new(
        &["type_text"],
        RuleCheck::Always("Regular text input"),
        RiskTier::Safe,
        false,
    ),
    RiskRule::new(
        &["press"],
        RuleCheck::EnterOnPaymentPage("Enter key on payment-related page"),
        RiskTier::Moderate,
        true,
    ),
    RiskRule::new(
        &["press"],
        RuleCheck::Always("Regular key press"),
        RiskTier::Safe,
        false,
    ),
];

/// Classifies proposed tool calls. Stateless; every call is judged afresh.
#[derive(Debug, Clone)]
pub struct RiskClassifier {
    rules: Vec<RiskRule>,
}

impl Default for RiskClassifier {
    fn default() -> Self {
        Self::new()
    }
}

impl RiskClassifier {
    pub fn new() -> Self {
        Self::with_rules(DEFAULT_RULES.to_vec())
    }

    pub fn with_rules(rules: Vec<RiskRule>) -> Self {
        Self { rules }
    }

    /// Classify `tool_name(args)` issued while `page_url` is open.
    ///
    /// `page_text` is a sample of the visible text, accepted for rules that
    /// want page context.
    pub fn classify(
        &self,
        tool_name: &str,
        args: &Value,
        page_url: &str,
        _page_text: &str,
    ) -> ActionClassification {
        for rule in &self.rules {
            if let Some(reason) = rule.evaluate(tool_name, args, page_url) {
                return ActionClassification {
                    risk: rule.risk,
                    reason,
                    requires_confirmation: rule.requires_confirmation,
                };
            }
        }
        ActionClassification {
            risk: RiskTier::Moderate,
            reason: "Unknown action type".to_string(),
            requires_confirmation: false,
        }
    }
}

/// Text shown to the user before a gated action runs.
pub fn format_confirmation_request(
    tool_name: &str,
    args: &Value,
    classification: &ActionClassification,
) -> String {
    format!(
        "Action: {}\nRisk: {}\nReason: {}\n\nDo you want to proceed with this action?",
        describe_action(tool_name, args),
        classification.risk,
        classification.reason
    )
}

fn describe_action(tool_name: &str, args: &Value) -> String {
    let or_unknown = |key: &str| match arg_str(args, key) {
        s if s.is_empty() => "unknown".to_string(),
        s => s,
    };
    match tool_name {
        "click" => format!("Click on element: {}", or_unknown("selector")),
        "type_text" => {
            let text = arg_str(args, "text");
            let text = if text.chars().count() > 30 {
                format!("{}...", text.chars().take(27).collect::<String>())
            } else {
                text
            };
            format!("Type '{}' into {}", text, or_unknown("selector"))
        }
        "press" => format!("Press key: {}", or_unknown("keys")),
        _ => format!("{}({})", tool_name, args),
    }
}

fn is_payment_page(url: &str) -> bool {
    let url = url.to_lowercase();
    PAYMENT_URL_PATTERNS.iter().any(|p| url.contains(p))
}

/// String form of an argument; empty when absent.
pub(crate) fn arg_str(args: &Value, key: &str) -> String {
    match args.get(key) {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
    }
}
