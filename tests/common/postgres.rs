use ak_migrate::databases::postgres::PostgresConfig;
use postgres::{Client, NoTls};
use testcontainers::{Container, runners::SyncRunner};

use super::testable_database::TestableDatabase;

pub struct TestPostgresDatabase {
    pub uri: String,
    pub config: PostgresConfig,
    pub client: Client,
    container: Container<testcontainers_modules::postgres::Postgres>,
}

impl TestPostgresDatabase {
    pub fn new() -> Self {
        let container = testcontainers_modules::postgres::Postgres::default()
            .start()
            .unwrap();

        let config = PostgresConfig {
            host: container.get_host().unwrap().to_string(),
            port: container.get_host_port_ipv4(5432).unwrap(),
            user: "postgres".to_string(),
            password: "postgres".to_string(),
            database: "postgres".to_string(),
        };
        let uri = format!(
            "postgres://{}:{}@{}:{}/{}",
            config.user, config.password, config.host, config.port, config.database
        );
        let client = Client::connect(&uri, NoTls)
            .expect("Unable to connect to the database created for tests");

        return Self {
            uri,
            config,
            client,
            container,
        };
    }

    pub fn query_text(&mut self, query: &str) -> Option<String> {
        return self.client.query_one(query, &[]).unwrap().get(0);
    }
}

impl TestableDatabase for TestPostgresDatabase {
    fn execute(&mut self, query: &str) {
        self.client.batch_execute(query).unwrap();
    }

    fn query_count(&mut self, query: &str) -> u64 {
        let count: i64 = self.client.query_one(query, &[]).unwrap().get(0);
        return count as u64;
    }
}
