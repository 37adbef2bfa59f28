pub trait TestDefault {
    /// Generate a default value used for testing. Use this instead of the `Default` trait
    /// if the default value only makes sense in tests and not in production code.
    fn test_default() -> Self;
}
