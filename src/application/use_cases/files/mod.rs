pub mod upload_cover_image;
