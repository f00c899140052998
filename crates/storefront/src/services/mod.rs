//! Business logic services for the site.
//!
//! # Services
//!
//! - `auth` - Password auth and the session-held user
//! - `cart` - Cart synchronization
//! - `wishlist` - Wishlist synchronization
//! - `applications` - Internship listings and applications
//! - `account` - Customer dashboard and profile
//! - `admin` - Back-office pages
//! - `forms` - Form field parsing

pub mod account;
pub mod admin;
pub mod applications;
pub mod auth;
pub mod cart;
pub mod forms;
pub mod wishlist;
