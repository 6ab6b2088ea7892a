pub mod diagnosis;
pub mod verdict;
