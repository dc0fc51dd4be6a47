/// Static information about a Gemini model.
#[derive(Clone, Debug)]
pub struct GeminiModelInfo {
    pub name: &'static str,
    pub display_name: &'static str,
    pub max_output: u32,
}

static GEMINI_2_0_FLASH_EXP: GeminiModelInfo = GeminiModelInfo {
    name: "gemini-2.0-flash-exp",
    display_name: "Gemini 2.0 Flash (experimental)",
    max_output: 8_192,
};

static GEMINI_2_0_FLASH: GeminiModelInfo = GeminiModelInfo {
    name: "gemini-2.0-flash",
    display_name: "Gemini 2.0 Flash",
    max_output: 8_192,
};

static GEMINI_1_5_FLASH: GeminiModelInfo = GeminiModelInfo {
    name: "gemini-1.5-flash",
    display_name: "Gemini 1.5 Flash",
    max_output: 8_192,
};

static GEMINI_1_5_PRO: GeminiModelInfo = GeminiModelInfo {
    name: "gemini-1.5-pro",
    display_name: "Gemini 1.5 Pro",
    max_output: 8_192,
};

static ALL_MODELS: &[&GeminiModelInfo] = &[
    &GEMINI_2_0_FLASH_EXP,
    &GEMINI_2_0_FLASH,
    &GEMINI_1_5_FLASH,
    &GEMINI_1_5_PRO,
];

pub fn find_model(name: &str) -> Option<&'static GeminiModelInfo> {
    ALL_MODELS.iter().find(|m| m.name == name).copied()
}
