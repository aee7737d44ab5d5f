use super::ast::{CompareOp, Direction, Expr};

/// Render `expr` as an English sentence for the editor preview.
///
/// The output depends only on the tree, so the same condition always
/// paraphrases to the same text.
///
/// # Examples
///
/// ```
/// use wxalarm_alert::condition::{paraphrase, parse};
///
/// let expr = parse("temperature > 85F && *lightning_count").unwrap();
/// assert_eq!(
///     paraphrase(&expr),
///     "temperature exceeds 85°F and lightning_count changes (any direction)"
/// );
/// ```
pub fn paraphrase(expr: &Expr) -> String {
    match expr {
        Expr::Comparison(c) => {
            let verb = match c.op {
                CompareOp::GreaterThan => "exceeds",
                CompareOp::LessThan => "is below",
                CompareOp::GreaterEqual => "is at least",
                CompareOp::LessEqual => "is at most",
                CompareOp::Equal => "is",
                CompareOp::NotEqual => "is not",
            };
            let unit = c.unit.map_or("", |u| u.display_suffix());
            format!("{} {verb} {}{unit}", c.field, c.literal)
        }
        Expr::ChangeDetect { field, direction } => {
            let change = match direction {
                Direction::Any => "changes (any direction)",
                Direction::Increase => "increases",
                Direction::Decrease => "decreases",
            };
            format!("{field} {change}")
        }
        Expr::And(l, r) => format!("{} and {}", paraphrase(l), paraphrase(r)),
        Expr::Or(l, r) => format!("{} or {}", paraphrase(l), paraphrase(r)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::condition::parse;

    fn say(src: &str) -> String {
        paraphrase(&parse(src).unwrap())
    }

    #[test]
    fn comparisons() {
        assert_eq!(say("temperature > 30C"), "temperature exceeds 30°C");
        assert_eq!(say("humidity >= 80"), "humidity is at least 80");
        assert_eq!(say("wind_speed > 25mph"), "wind_speed exceeds 25 mph");
        assert_eq!(say("lightning_distance < 5"), "lightning_distance is below 5");
        assert_eq!(say("pressure <= 1013.25"), "pressure is at most 1013.25");
        assert_eq!(say("wind_direction != 0"), "wind_direction is not 0");
        assert_eq!(say("uv == 8"), "uv is 8");
    }

    #[test]
    fn aliases_paraphrase_as_canonical_names() {
        assert_eq!(say("temp > 85f"), "temperature exceeds 85°F");
        assert_eq!(say("wind < 5m/s"), "wind_speed is below 5 m/s");
    }

    #[test]
    fn change_detection() {
        assert_eq!(say("*lightning_count"), "lightning_count changes (any direction)");
        assert_eq!(say(">rain_rate"), "rain_rate increases");
        assert_eq!(say("<lightning_distance"), "lightning_distance decreases");
    }

    #[test]
    fn connectives_keep_source_order() {
        assert_eq!(
            say("lux < 1000 || lux > 100000 && uv > 8"),
            "lux is below 1000 or lux exceeds 100000 and uv exceeds 8"
        );
    }
}
