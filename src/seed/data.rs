use crate::logic::import::{import_records, read_records, ImportError, ImportSummary, DEFAULT_BATCH_SIZE};
use crate::model::NewInventoryRecord;
use crate::store::traits::Store;
use anyhow::Result;

/// A small snapshot in the export's format. Prices are mostly in paise,
/// a few low-priced lines are already in rupees, and it carries the usual
/// defects: zero prices, a missing category and repeated product names.
pub const SAMPLE_CSV: &str = "\
Category,name,mrp,discountPercent,availableQuantity,discountedSellingPrice,weightInGms,outOfStock,quantity
Fruits & Vegetables,Onion,2500,10,3,2250,1000,FALSE,1
Fruits & Vegetables,Onion,4900,8,0,4500,2000,TRUE,2
Fruits & Vegetables,Tomato Hybrid,3300,15,5,2800,500,FALSE,500
Fruits & Vegetables,Banana Robusta,6000,20,0,4800,1200,TRUE,6
Dairy Bread & Eggs,Amul Taaza Toned Milk,2700,0,6,2700,500,FALSE,1
Dairy Bread & Eggs,Farm Fresh Eggs,9000,12,2,7900,360,FALSE,6
Dairy Bread & Eggs,Amul Salted Butter,5800,3,4,5600,100,FALSE,1
Munchies,Lay's Classic Salted,2000,0,10,2000,52,FALSE,1
Munchies,Kurkure Masala Munch,2000,5,0,1900,90,TRUE,1
Munchies,Haldiram's Bhujia,11000,18,3,9000,400,FALSE,1
Cooking Essentials,Aashirvaad Atta,48000,22,2,37400,5000,FALSE,1
Cooking Essentials,Fortune Sunflower Oil,17500,9,0,15900,1000,TRUE,1
Cooking Essentials,Tata Salt,2800,0,0,0,1000,TRUE,1
Cooking Essentials,India Gate Basmati Rice,79900,35,1,51900,5000,FALSE,1
Beverages,Coca-Cola,4000,5,8,3800,750,FALSE,1
Beverages,Tata Tea Gold,56000,30,0,39200,1000,TRUE,1
Beverages,Red Bull Energy Drink,12500,0,6,12500,250,FALSE,1
Personal Care,Dove Shampoo,60000,45,2,33000,650,FALSE,1
Personal Care,Colgate Strong Teeth,0,0,4,0,200,FALSE,1
Personal Care,Nivea Body Lotion,39900,25,0,29900,400,TRUE,1
,Loose Jaggery,900,0,5,900,1000,FALSE,1000
Packaged Food,Maggi Masala Noodles,9600,6,12,9000,560,FALSE,8
Packaged Food,Maggi Masala Noodles,1400,7,20,1300,70,FALSE,1
Packaged Food,Kissan Mixed Fruit Jam,18500,40,1,11100,700,FALSE,1
Packaged Food,Kellogg's Corn Flakes,450,8,3,414,475,FALSE,1
Home & Cleaning,Surf Excel Easy Wash,64000,50,0,32000,5500,TRUE,1
Home & Cleaning,Vim Dishwash Bar,1000,10,9,900,300,FALSE,3
Home & Cleaning,Harpic Toilet Cleaner,19900,4,0,19100,1000,TRUE,1
";

pub fn sample_records() -> Result<Vec<NewInventoryRecord>, ImportError> {
    read_records(SAMPLE_CSV.as_bytes())
}

/// Insert the sample snapshot into an existing table.
pub async fn load_sample_data<S: Store + ?Sized>(store: &S) -> Result<ImportSummary> {
    let records = sample_records()?;
    import_records(store, &records, DEFAULT_BATCH_SIZE).await
}
