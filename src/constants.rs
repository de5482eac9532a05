//! Project-wide constants

/// Consumer group shared by all store service instances answering requests
pub const GROUP_STORE: &str = "store";

/// Consumer group shared by all content service instances answering requests
pub const GROUP_CONTENT: &str = "content";

/// Consumer group shared by all media service instances answering requests
pub const GROUP_MEDIA: &str = "media";

/// Consumer group shared by all publishing service instances answering requests
pub const GROUP_PUBLISHING: &str = "publishing";
