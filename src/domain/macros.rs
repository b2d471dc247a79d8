#[macro_export]
macro_rules! id {
    ($name:ident) => {
        #[derive(
            Copy, Clone,
            Debug, derive_more::Display,
            PartialEq, Eq, Hash,
            derive_more::Constructor, derive_more::From,
            serde::Serialize, serde::Deserialize,
            sqlx::Type
        )]
        #[sqlx(transparent)]
        #[serde(transparent)]
        pub struct $name(i64);

        impl $name {
            pub fn value(&self) -> i64 {
                self.0
            }
        }
    };
    ($($name:ident),+) => {
        $($crate::id!($name);)+
    }
}
