pub mod letterboxd;
pub mod picks;
pub mod recommender;
