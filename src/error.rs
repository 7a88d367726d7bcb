use snafu::Snafu;

#[derive(Snafu, Debug, Clone, PartialEq)]
pub enum SchedulerError {
    #[snafu(display("rating {rating} is outside the valid range 1..=4"))]
    InvalidRating { rating: u8 },
    #[snafu(display("model parameters must be 21 finite values"))]
    InvalidParameters,
    #[snafu(display("desired retention {retention} must lie strictly between 0 and 1"))]
    InvalidRetention { retention: f32 },
    #[snafu(display("no tracked item {item} for owner {owner}"))]
    NotFound { owner: String, item: String },
    #[snafu(display("conflicting write for item {item} of owner {owner}"))]
    Conflict { owner: String, item: String },
}

pub type Result<T, E = SchedulerError> = std::result::Result<T, E>;
