pub const INDEX_TEMPLATE: &str = "index.html";
pub const ABOUT_TEMPLATE: &str = "about.html";
pub const LOGIN_TEMPLATE: &str = "login.html";
pub const REGISTER_TEMPLATE: &str = "register.html";
pub const PROFILE_TEMPLATE: &str = "profile.html";
pub const ADMIN_TEMPLATE: &str = "admin.html";
pub const CREATE_POST_TEMPLATE: &str = "create_post.html";
