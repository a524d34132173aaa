mod play_rate;
mod teamplay_rate;
mod win_rate;

pub use play_rate::PlayRateCalculator;
pub use teamplay_rate::TeamplayRateCalculator;
pub use win_rate::WinRateCalculator;
