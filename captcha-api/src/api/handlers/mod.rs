pub mod captcha;
pub mod system;
