mod envelope;
pub use self::envelope::Envelope;

mod contest;
pub use self::contest::{Contest, ContestPhase};

mod standings;
pub use self::standings::{Member, Party, Problem, RanklistRow, Standings};

mod submission;
pub use self::submission::Submission;
