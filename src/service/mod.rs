pub mod company;
pub mod finance;

pub use company::CompanyService;
pub use finance::FinanceService;
