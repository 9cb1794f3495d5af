pub mod faschim;
