mod common;
pub use self::common::Query;

mod announcement;
pub use self::announcement::{AnnouncementQuery, Index};

mod search;
pub use self::search::SearchQuery;
