#[derive(Clone, Copy, Debug)]
pub(crate) struct CommandSpec {
    pub command: &'static str,
    pub action: &'static str,
    pub key: &'static str,
}

const fn spec(command: &'static str, action: &'static str, key: &'static str) -> CommandSpec {
    CommandSpec {
        command,
        action,
        key,
    }
}

/// Settings that take the rest of the line verbatim.
pub(crate) const RAW_ARG_COMMANDS: &[CommandSpec] = &[
    spec("palette", "set_option", "palette"),
    spec("avoid", "set_option", "negative"),
    spec("style", "set_option", "style"),
    spec("game", "set_option", "game_name"),
    spec("material", "set_option", "material"),
    spec("noise_type", "set_option", "noise_type"),
    spec("edge", "set_option", "edge"),
    spec("engine", "set_option", "engine"),
    spec("mood", "set_option", "mood"),
    spec("aspect", "set_aspect", "aspect"),
    spec("variants", "set_variants", "count"),
    spec("category", "set_category", "category"),
    spec("refine", "set_refine", "value"),
];

pub(crate) const TIER_COMMANDS: &[&str] = &["draft", "final"];

/// Generate commands; the rest of the line is the prompt.
pub(crate) const CATEGORY_COMMANDS: &[CommandSpec] = &[
    spec("logo", "generate", "logo"),
    spec("banner", "generate", "banner"),
    spec("texture", "generate", "texture"),
    spec("ui", "generate", "ui-element"),
    spec("noise", "generate", "noise"),
    spec("cookie", "generate", "cookie"),
    spec("ideas", "brainstorm", "brainstorm"),
];

/// `<path> <prompt...>` commands.
pub(crate) const PATH_TEXT_COMMANDS: &[CommandSpec] = &[
    spec("edit", "edit", "path"),
    spec("uv_paint", "uv_paint", "path"),
];

pub(crate) const SINGLE_PATH_COMMANDS: &[CommandSpec] = &[
    spec("ref", "set_reference", "path"),
    spec("mask", "set_mask", "path"),
    spec("analyze", "analyze", "path"),
    spec("style_of", "describe_style", "path"),
    spec("remaster", "remaster", "target"),
    spec("delete", "delete", "id"),
    spec("export", "export", "dir"),
];

pub(crate) const NO_ARG_COMMANDS: &[CommandSpec] = &[
    spec("list", "list", ""),
    spec("clear", "clear_inputs", ""),
    spec("help", "help", ""),
    spec("quit", "quit", ""),
    spec("exit", "quit", ""),
];

pub const STUDIO_HELP_COMMANDS: &[&str] = &[
    "/logo",
    "/banner",
    "/texture",
    "/ui",
    "/noise",
    "/cookie",
    "/ideas",
    "/edit",
    "/uv_paint",
    "/remaster",
    "/analyze",
    "/style_of",
    "/ref",
    "/mask",
    "/clear",
    "/palette",
    "/avoid",
    "/style",
    "/game",
    "/material",
    "/noise_type",
    "/edge",
    "/engine",
    "/mood",
    "/aspect",
    "/variants",
    "/category",
    "/refine",
    "/draft",
    "/final",
    "/list",
    "/delete",
    "/export",
    "/help",
    "/quit",
];
