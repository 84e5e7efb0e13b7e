use console::Emoji;

pub static HOUR_GLASS: Emoji<'_, '_> = Emoji("⏳ ", " =>");
pub static SUCCESS: Emoji<'_, '_> = Emoji("✅ ", " =>");
pub static VAN: Emoji<'_, '_> = Emoji("🚚 ", " =>");
