use rand::seq::SliceRandom;
use rand::Rng;

const USER_AGENTS: [&str; 3] = [
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/126.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/126.0.0.0 Safari/537.36",
    "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/126.0.0.0 Safari/537.36",
];

// Boards collapse the list/detail split below roughly 1280px
const WINDOW_SIZES: [(u32, u32); 4] = [(1920, 1080), (1536, 864), (1440, 900), (1680, 1050)];

/// Browser identity the page is launched with.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FingerprintConfig {
    pub user_agent: String,
    pub viewport_width: u32,
    pub viewport_height: u32,
}

impl FingerprintConfig {
    /// Pick a desktop user agent and window size at random.
    pub fn randomized() -> Self {
        Self::pick(&mut rand::thread_rng())
    }

    fn pick(rng: &mut impl Rng) -> Self {
        let user_agent = USER_AGENTS.choose(rng).copied().unwrap_or(USER_AGENTS[0]);
        let (width, height) = WINDOW_SIZES.choose(rng).copied().unwrap_or(WINDOW_SIZES[0]);
        Self {
            user_agent: user_agent.to_string(),
            viewport_width: width,
            viewport_height: height,
        }
    }

    /// Keep the user agent but pin the window size.
    #[must_use]
    pub fn with_viewport(mut self, width: u32, height: u32) -> Self {
        self.viewport_width = width;
        self.viewport_height = height;
        self
    }
}
