use ratatui::style::{Color, Modifier, Style};
use ratatui::text::Span;
use ratatui::DefaultTerminal;
use rust_decimal::Decimal;

use crate::fmt::money;

pub const HEADER_STYLE: Style = Style::new()
    .fg(Color::Yellow)
    .add_modifier(Modifier::BOLD);

pub const FOOTER_STYLE: Style = Style::new().fg(Color::DarkGray);

pub const ERROR_STYLE: Style = Style::new().fg(Color::Red);
pub const OK_STYLE: Style = Style::new().fg(Color::Rgb(80, 220, 100));

pub const EXPENSE_STYLE: Style = Style::new().fg(Color::Red);
pub const CREDIT_STYLE: Style = Style::new().fg(Color::Rgb(80, 220, 100));

/// Format an amount as a colored Span (red for expenses, green for credits).
/// Shows absolute value; color conveys the sign.
pub fn money_span(amount: Decimal) -> Span<'static> {
    let style = if amount.is_sign_positive() {
        EXPENSE_STYLE
    } else {
        CREDIT_STYLE
    };
    Span::styled(money(amount.abs()), style)
}

/// Enter the alternate screen, restoring the terminal if anything panics
/// while it is active. Pair with [`ratatui::restore`].
pub fn init_terminal() -> DefaultTerminal {
    let hook = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |info| {
        ratatui::restore();
        hook(info);
    }));
    ratatui::init()
}
