//! Domain aggregates and their search criteria.
//!
//! One file per aggregate; each carries the entity struct plus the
//! sparse filter struct its search screen posts.

mod banner;
mod blog_post;
mod category;
mod game_account;
mod promotion;
mod slider;
mod user;

pub use banner::{Banner, BannerFilter};
pub use blog_post::{BlogPost, BlogPostFilter};
pub use category::{Category, CategoryFilter};
pub use game_account::{GameAccount, GameAccountFilter};
pub use promotion::{Promotion, PromotionFilter};
pub use slider::{Slider, SliderFilter};
pub use user::{Role, User, UserFilter};
