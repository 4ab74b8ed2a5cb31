pub trait TestableDatabase {
    fn execute(&mut self, query: &str);

    fn query_count(&mut self, query: &str) -> u64;
}
